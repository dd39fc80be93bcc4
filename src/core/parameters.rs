// src/core/parameters.rs

//! The parameter type model.
//!
//! Every declared parameter is classified exactly once, at registration, into
//! a [`ParamKind`] and a closed [`ParamType`]. Nothing downstream re-inspects
//! annotations.

use crate::core::annotation::{AnnotationError, TypeExpr};
use crate::core::commons::{hyphenate, is_identifier};
use crate::core::converters::{self, ConversionError};
use crate::models::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Problems found while turning a declared parameter list into [`Parameter`]s.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("'{name}' is not a valid parameter name")]
    InvalidName { name: String },
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(
        "bool params must be keyword-only: '{name}' would be ambiguous as a positional value"
    )]
    BoolPositional { name: String },
    #[error("bool params must have a True/False default: '{name}' has none")]
    BoolWithoutDefault { name: String },
    #[error("parameter '{name}' has unsupported type '{ty}' and no default value")]
    UnsupportedType { name: String, ty: String },
    #[error(
        "positional list parameter '{name}' cannot default to an empty list; declare it as `list[T] | None` with a None default"
    )]
    MutableListDefault { name: String },
    #[error("variadic parameter '{name}' cannot have a default value")]
    VariadicDefault { name: String },
    #[error("parameter '{name}' is declared more than once")]
    DuplicateParameter { name: String },
    #[error("required positional parameter '{name}' follows a parameter with a default")]
    RequiredAfterOptional { name: String },
    #[error("only one {kind} parameter is allowed, '{name}' is a second one")]
    DuplicateVariadic { kind: ParamKind, name: String },
    #[error("multi-valued positional parameter '{name}' must be the last positional parameter")]
    MultiValuePositionalNotLast { name: String },
    #[error("parameter name '{name}' is reserved for the generated help flag")]
    ReservedName { name: String },
    #[error("parameter '{name}' declares an empty choice")]
    EmptyChoice { name: String },
    #[error("choice for parameter '{name}' does not match its type: {source}")]
    InvalidChoice {
        name: String,
        #[source]
        source: ConversionError,
    },
}

pub type ParameterResult<T> = Result<T, ParameterError>;

// --- CLASSIFICATION ---

/// How a parameter is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    PositionalRequired,
    PositionalWithDefault,
    KeywordOnly,
    VarPositional,
    VarKeyword,
}

impl ParamKind {
    /// Plain positional slots, excluding the variadic collector.
    pub fn is_positional(self) -> bool {
        matches!(self, Self::PositionalRequired | Self::PositionalWithDefault)
    }

    pub fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PositionalRequired => "positional",
            Self::PositionalWithDefault => "positional-with-default",
            Self::KeywordOnly => "keyword-only",
            Self::VarPositional => "variadic-positional",
            Self::VarKeyword => "variadic-keyword",
        })
    }
}

/// Element types a token can be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int,
    Float,
    Str,
}

impl Scalar {
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "str" => Some(Self::Str),
            _ => None,
        }
    }
}

/// The closed set of parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// No annotation and no informative default; handled as a string.
    Untyped,
    Bool,
    Int,
    Float,
    Str,
    /// `list` or `list[T]`.
    List(Option<Scalar>),
    /// `list[T] | None`; assignable from the CLI although it also permits no value.
    OptionalList(Option<Scalar>),
    /// Anything else; carries the annotation text for messages.
    Unsupported(String),
}

impl ParamType {
    /// An explicit annotation wins; otherwise the default's runtime type decides;
    /// otherwise the parameter is untyped.
    pub fn classify(annotation: Option<&TypeExpr>, default: Option<&Value>) -> Self {
        match annotation {
            Some(expr) => Self::from_annotation(expr),
            None => default.map_or(Self::Untyped, Self::infer_from_default),
        }
    }

    pub fn from_annotation(expr: &TypeExpr) -> Self {
        match expr {
            TypeExpr::Name(name) => match name.as_str() {
                "str" => Self::Str,
                "int" => Self::Int,
                "float" => Self::Float,
                "bool" => Self::Bool,
                "list" => Self::List(None),
                _ => Self::Unsupported(expr.to_string()),
            },
            TypeExpr::Generic { name, args } if name == "list" => list_element(args)
                .map_or_else(|| Self::Unsupported(expr.to_string()), Self::List),
            TypeExpr::Union(members) => {
                let (nones, others): (Vec<&TypeExpr>, Vec<&TypeExpr>) =
                    members.iter().partition(|m| m.is_none());
                match (nones.len(), others.as_slice()) {
                    (1, [single]) => match Self::from_annotation(single) {
                        Self::List(elem) => Self::OptionalList(elem),
                        _ => Self::Unsupported(expr.to_string()),
                    },
                    _ => Self::Unsupported(expr.to_string()),
                }
            }
            _ => Self::Unsupported(expr.to_string()),
        }
    }

    /// Only the four primitive runtime types are informative.
    pub fn infer_from_default(default: &Value) -> Self {
        match default {
            Value::Bool(_) => Self::Bool,
            Value::Int(_) => Self::Int,
            Value::Float(_) => Self::Float,
            Value::Str(_) => Self::Str,
            _ => Self::Untyped,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Types that take one or more tokens on the command line.
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::List(_) | Self::OptionalList(_))
    }

    /// The element type tokens are converted into, if tokens are accepted at all.
    pub fn token_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Untyped | Self::Str => Some(Scalar::Str),
            Self::Int => Some(Scalar::Int),
            Self::Float => Some(Scalar::Float),
            Self::List(elem) | Self::OptionalList(elem) => Some(elem.unwrap_or(Scalar::Str)),
            Self::Bool | Self::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untyped => f.write_str("untyped"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::List(None) => f.write_str("list"),
            Self::List(Some(elem)) => write!(f, "list[{}]", elem.name()),
            Self::OptionalList(None) => f.write_str("list | None"),
            Self::OptionalList(Some(elem)) => write!(f, "list[{}] | None", elem.name()),
            Self::Unsupported(text) => f.write_str(text),
        }
    }
}

fn list_element(args: &[TypeExpr]) -> Option<Option<Scalar>> {
    match args {
        [TypeExpr::Name(name)] => Scalar::from_name(name).map(Some),
        _ => None,
    }
}

// --- DECLARATION ---

/// Per-parameter metadata. Validated when the task is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamOptions {
    pub help: Option<String>,
    /// Accepted values; each must convert to the parameter's element type.
    pub choices: Vec<String>,
    pub metavar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declared {
    Positional,
    Keyword,
    VarPositional,
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq)]
enum AnnotationSource {
    Text(String),
    Expr(TypeExpr),
}

/// A parameter declaration, as written by the task author.
///
/// ```
/// use tasker::core::parameters::Param;
///
/// let files = Param::keyword("files").annotation("list[str] | None").default(None::<String>);
/// let jobs = Param::keyword("jobs").default(4);
/// # let _ = (files, jobs);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    declared: Declared,
    annotation: Option<AnnotationSource>,
    default: Option<Value>,
    options: ParamOptions,
}

impl Param {
    fn declare(name: impl Into<String>, declared: Declared) -> Self {
        Self {
            name: name.into(),
            declared,
            annotation: None,
            default: None,
            options: ParamOptions::default(),
        }
    }

    /// A positional parameter; it becomes optional once it has a default.
    pub fn positional(name: impl Into<String>) -> Self {
        Self::declare(name, Declared::Positional)
    }

    /// A keyword-only parameter, exposed as `--long-name`.
    pub fn keyword(name: impl Into<String>) -> Self {
        Self::declare(name, Declared::Keyword)
    }

    /// Collects the remaining positional values (`*args`).
    pub fn var_positional(name: impl Into<String>) -> Self {
        Self::declare(name, Declared::VarPositional)
    }

    /// Collects unmatched keyword values in direct calls (`**kwargs`). Never on the CLI.
    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self::declare(name, Declared::VarKeyword)
    }

    /// Annotation text such as `int` or `list[str] | None`. Blank text means no annotation.
    pub fn annotation(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.annotation = if text.trim().is_empty() {
            None
        } else {
            Some(AnnotationSource::Text(text))
        };
        self
    }

    /// An already-built annotation.
    pub fn typed(mut self, expr: TypeExpr) -> Self {
        self.annotation = Some(AnnotationSource::Expr(expr));
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.options.help = Some(help.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.options.metavar = Some(metavar.into());
        self
    }

    pub fn options(mut self, options: ParamOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classifies and validates the declaration.
    pub fn build(self) -> ParameterResult<Parameter> {
        if !is_identifier(&self.name) {
            return Err(ParameterError::InvalidName { name: self.name });
        }

        let annotation = match self.annotation {
            Some(AnnotationSource::Text(text)) => Some(TypeExpr::parse(&text)?),
            Some(AnnotationSource::Expr(expr)) => Some(expr),
            None => None,
        };

        let kind = match (self.declared, &self.default) {
            (Declared::Positional, None) => ParamKind::PositionalRequired,
            (Declared::Positional, Some(_)) => ParamKind::PositionalWithDefault,
            (Declared::Keyword, _) => ParamKind::KeywordOnly,
            (Declared::VarPositional | Declared::VarKeyword, Some(_)) => {
                return Err(ParameterError::VariadicDefault { name: self.name });
            }
            (Declared::VarPositional, None) => ParamKind::VarPositional,
            (Declared::VarKeyword, None) => ParamKind::VarKeyword,
        };

        let ty = ParamType::classify(annotation.as_ref(), self.default.as_ref());
        let parameter = Parameter {
            name: self.name,
            kind,
            ty,
            annotation,
            default: self.default,
            options: self.options,
        };
        parameter.validate()?;
        Ok(parameter)
    }
}

// --- CLASSIFIED PARAMETER ---

/// A classified, validated parameter. Immutable after registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub ty: ParamType,
    pub annotation: Option<TypeExpr>,
    pub default: Option<Value>,
    pub options: ParamOptions,
}

impl Parameter {
    pub fn has_supported_type(&self) -> bool {
        self.ty.is_supported()
    }

    /// The hyphenated name used for flags and positional slots.
    pub fn cli_name(&self) -> String {
        hyphenate(&self.name)
    }

    /// Whether the parameter appears on the synthesized command line.
    pub fn is_cli_assignable(&self) -> bool {
        self.kind != ParamKind::VarKeyword && self.has_supported_type()
    }

    /// Multi-valued on the command line: lists and the variadic collector.
    pub fn is_multi(&self) -> bool {
        self.kind == ParamKind::VarPositional || self.ty.is_multi()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.kind.is_variadic()
    }

    pub fn help(&self) -> Option<&str> {
        self.options.help.as_deref()
    }

    fn validate(&self) -> ParameterResult<()> {
        let name = || self.name.clone();

        if self.kind == ParamKind::VarKeyword {
            return Ok(());
        }

        match &self.ty {
            ParamType::Bool => match self.kind {
                ParamKind::KeywordOnly => {
                    if !matches!(self.default, Some(Value::Bool(_))) {
                        return Err(ParameterError::BoolWithoutDefault { name: name() });
                    }
                }
                _ => return Err(ParameterError::BoolPositional { name: name() }),
            },
            ParamType::Unsupported(ty) => {
                if self.default.is_none() {
                    return Err(ParameterError::UnsupportedType {
                        name: name(),
                        ty: ty.clone(),
                    });
                }
                log::warn!(
                    "Parameter '{}' has unsupported type '{}'; it is only reachable through direct calls.",
                    self.name,
                    ty
                );
            }
            ty if ty.is_multi() => {
                if self.kind == ParamKind::VarPositional {
                    return Err(ParameterError::UnsupportedType {
                        name: name(),
                        ty: ty.to_string(),
                    });
                }
                let empty_list_default =
                    matches!(&self.default, Some(Value::List(items)) if items.is_empty());
                if self.kind.is_positional() && empty_list_default {
                    return Err(ParameterError::MutableListDefault { name: name() });
                }
            }
            _ => {}
        }

        self.validate_choices()
    }

    fn validate_choices(&self) -> ParameterResult<()> {
        for choice in &self.options.choices {
            if choice.trim().is_empty() {
                return Err(ParameterError::EmptyChoice {
                    name: self.name.clone(),
                });
            }
            if let Some(scalar) = self.ty.token_scalar() {
                converters::convert_scalar(&self.name, choice, scalar).map_err(|source| {
                    ParameterError::InvalidChoice {
                        name: self.name.clone(),
                        source,
                    }
                })?;
            }
        }
        Ok(())
    }
}

/// Checks a task's parameter list as a whole.
pub fn validate_signature(params: &[Parameter]) -> ParameterResult<()> {
    let mut names = HashSet::new();
    let mut cli_names = HashSet::new();
    let mut seen_optional_positional = false;
    let mut seen_multi_positional: Option<&str> = None;
    let mut var_positional = 0;
    let mut var_keyword = 0;

    for param in params {
        if !names.insert(param.name.as_str()) || !cli_names.insert(param.cli_name()) {
            return Err(ParameterError::DuplicateParameter {
                name: param.name.clone(),
            });
        }
        if param.is_cli_assignable() && param.cli_name() == "help" {
            return Err(ParameterError::ReservedName {
                name: param.name.clone(),
            });
        }

        match param.kind {
            ParamKind::VarPositional => {
                var_positional += 1;
                if var_positional > 1 {
                    return Err(ParameterError::DuplicateVariadic {
                        kind: param.kind,
                        name: param.name.clone(),
                    });
                }
            }
            ParamKind::VarKeyword => {
                var_keyword += 1;
                if var_keyword > 1 {
                    return Err(ParameterError::DuplicateVariadic {
                        kind: param.kind,
                        name: param.name.clone(),
                    });
                }
            }
            ParamKind::PositionalRequired if seen_optional_positional => {
                return Err(ParameterError::RequiredAfterOptional {
                    name: param.name.clone(),
                });
            }
            ParamKind::PositionalWithDefault => seen_optional_positional = true,
            _ => {}
        }

        let takes_positional_slot = param.is_cli_assignable()
            && (param.kind.is_positional() || param.kind == ParamKind::VarPositional);
        if takes_positional_slot {
            if let Some(multi) = seen_multi_positional {
                return Err(ParameterError::MultiValuePositionalNotLast {
                    name: multi.to_string(),
                });
            }
            if param.is_multi() {
                seen_multi_positional = Some(&param.name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(param: Param) -> Parameter {
        param.build().unwrap()
    }

    #[test]
    fn test_annotation_wins_over_default() {
        let p = build(Param::positional("count").annotation("int").default("3"));
        assert_eq!(p.ty, ParamType::Int);

        let p = build(Param::keyword("ratio").annotation("str").default(0.5));
        assert_eq!(p.ty, ParamType::Str);

        let p = build(Param::keyword("flag").annotation("bool").default(true));
        assert_eq!(p.ty, ParamType::Bool);
    }

    #[test]
    fn test_type_inferred_from_default() {
        assert_eq!(build(Param::keyword("a").default(true)).ty, ParamType::Bool);
        assert_eq!(build(Param::keyword("b").default(1)).ty, ParamType::Int);
        assert_eq!(build(Param::keyword("c").default(1.5)).ty, ParamType::Float);
        assert_eq!(build(Param::keyword("d").default("x")).ty, ParamType::Str);
        assert_eq!(
            build(Param::keyword("e").default(Value::None)).ty,
            ParamType::Untyped
        );
        assert_eq!(build(Param::positional("f")).ty, ParamType::Untyped);
    }

    #[test]
    fn test_blank_annotation_is_ignored() {
        let p = build(Param::positional("n").annotation("  ").default(7));
        assert_eq!(p.ty, ParamType::Int);
        assert!(p.annotation.is_none());
    }

    #[test]
    fn test_list_classification() {
        let ty = |text: &str| ParamType::from_annotation(&TypeExpr::parse(text).unwrap());
        assert_eq!(ty("list"), ParamType::List(None));
        assert_eq!(ty("list[int]"), ParamType::List(Some(Scalar::Int)));
        assert_eq!(
            ty("list[float] | None"),
            ParamType::OptionalList(Some(Scalar::Float))
        );
        assert_eq!(
            ty("Optional[List[str]]"),
            ParamType::OptionalList(Some(Scalar::Str))
        );
        assert!(!ty("list[bool]").is_supported());
        assert!(!ty("str | None").is_supported());
        assert!(!ty("int | str").is_supported());
        assert!(!ty("dict[str, int]").is_supported());
        assert!(!ty("tuple[int, int]").is_supported());
        assert!(!ty("Path").is_supported());
    }

    #[test]
    fn test_has_supported_type_table() {
        let supported = [
            "str",
            "int",
            "float",
            "bool",
            "list",
            "list[int]",
            "list[str] | None",
        ];
        for text in supported {
            let ty = ParamType::from_annotation(&TypeExpr::parse(text).unwrap());
            assert!(ty.is_supported(), "{} should be supported", text);
        }
        assert!(ParamType::Untyped.is_supported());
    }

    #[test]
    fn test_bool_positional_is_rejected() {
        let err = Param::positional("verbose")
            .annotation("bool")
            .default(false)
            .build()
            .unwrap_err();
        assert!(matches!(err, ParameterError::BoolPositional { .. }));
        assert!(err.to_string().contains("bool params must"));

        let err = Param::positional("verbose").annotation("bool").build().unwrap_err();
        assert!(matches!(err, ParameterError::BoolPositional { .. }));
    }

    #[test]
    fn test_keyword_bool_requires_default() {
        let err = Param::keyword("force").annotation("bool").build().unwrap_err();
        assert!(matches!(err, ParameterError::BoolWithoutDefault { .. }));
        assert!(err.to_string().contains("bool params must"));

        assert!(Param::keyword("force").default(false).build().is_ok());
    }

    #[test]
    fn test_unsupported_type_needs_default() {
        let err = Param::positional("mapping")
            .annotation("dict[str, int]")
            .build()
            .unwrap_err();
        assert!(matches!(err, ParameterError::UnsupportedType { .. }));

        let p = build(
            Param::keyword("mapping")
                .annotation("dict[str, int]")
                .default(Value::opaque("dict")),
        );
        assert!(!p.has_supported_type());
        assert!(!p.is_cli_assignable());
    }

    #[test]
    fn test_positional_empty_list_default_is_rejected() {
        let err = Param::positional("files")
            .annotation("list[str]")
            .default(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, ParameterError::MutableListDefault { .. }));

        let p = build(
            Param::keyword("files")
                .annotation("list[str]")
                .default(Vec::<String>::new()),
        );
        assert_eq!(p.ty, ParamType::List(Some(Scalar::Str)));
    }

    #[test]
    fn test_variadic_rules() {
        let err = Param::var_positional("rest").default(1).build().unwrap_err();
        assert!(matches!(err, ParameterError::VariadicDefault { .. }));

        let p = build(Param::var_positional("rest").annotation("int"));
        assert_eq!(p.kind, ParamKind::VarPositional);
        assert!(p.is_multi());

        let err = Param::var_positional("rest")
            .annotation("list[int]")
            .build()
            .unwrap_err();
        assert!(matches!(err, ParameterError::UnsupportedType { .. }));

        let kw = build(Param::var_keyword("extra").annotation("dict[str, str]"));
        assert!(!kw.is_cli_assignable());
    }

    #[test]
    fn test_choices_must_match_type() {
        let err = Param::keyword("level")
            .annotation("int")
            .default(1)
            .choices(["1", "two"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ParameterError::InvalidChoice { .. }));

        assert!(
            Param::keyword("mode")
                .default("fast")
                .choices(["fast", "slow"])
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_invalid_names_and_annotations() {
        assert!(matches!(
            Param::positional("1st").build(),
            Err(ParameterError::InvalidName { .. })
        ));
        assert!(matches!(
            Param::positional("x").annotation("list[").build(),
            Err(ParameterError::Annotation(_))
        ));
    }

    #[test]
    fn test_signature_validation() {
        let ok = [
            build(Param::positional("src")),
            build(Param::positional("dst").default("out")),
            build(Param::var_positional("rest")),
            build(Param::keyword("force").default(false)),
        ];
        assert!(validate_signature(&ok).is_ok());

        let dup = [build(Param::positional("a")), build(Param::keyword("a").default(1))];
        assert!(matches!(
            validate_signature(&dup),
            Err(ParameterError::DuplicateParameter { .. })
        ));

        let order = [
            build(Param::positional("a").default(1)),
            build(Param::positional("b")),
        ];
        assert!(matches!(
            validate_signature(&order),
            Err(ParameterError::RequiredAfterOptional { .. })
        ));

        let multi = [
            build(Param::positional("files").annotation("list[str]")),
            build(Param::positional("dest")),
        ];
        assert!(matches!(
            validate_signature(&multi),
            Err(ParameterError::MultiValuePositionalNotLast { .. })
        ));

        let reserved = [build(Param::keyword("help").default("x"))];
        assert!(matches!(
            validate_signature(&reserved),
            Err(ParameterError::ReservedName { .. })
        ));
    }
}
