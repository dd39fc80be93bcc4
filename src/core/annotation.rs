// src/core/annotation.rs

//! Type annotations written in the familiar type-hint grammar.
//!
//! Annotations are parsed exactly once, when a task is registered, into a
//! [`TypeExpr`] tree. The classifier in [`crate::core::parameters`] turns
//! that tree into a closed [`crate::core::parameters::ParamType`].

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use thiserror::Error;

lazy_static! {
    static ref TOKEN_RE: Regex =
        Regex::new(r"^\s*(?:([A-Za-z_][A-Za-z0-9_.]*)|([\[\],|]))")
            .expect("annotation token regex is valid");
}

/// Raised when an annotation string does not follow the type-hint grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("invalid type annotation '{text}': unexpected character at offset {offset}")]
    UnexpectedChar { text: String, offset: usize },
    #[error("invalid type annotation '{text}': {reason}")]
    Malformed { text: String, reason: String },
}

type AnnotationResult<T> = Result<T, AnnotationError>;

/// A parsed type annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// The `None` type.
    None,
    /// A bare type name such as `int` or `Path`.
    Name(String),
    /// A subscripted type such as `list[int]` or `dict[str, int]`.
    Generic { name: String, args: Vec<TypeExpr> },
    /// `A | B`, `Union[A, B]` and `Optional[A]` all normalize to this.
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    /// Parses an annotation such as `list[int] | None`.
    pub fn parse(text: &str) -> AnnotationResult<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            text,
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser.union()?;
        if parser.pos != tokens.len() {
            return Err(parser.malformed("trailing input after type"));
        }
        Ok(expr)
    }

    /// Shorthand for `TypeExpr::Name`.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Shorthand for `list[elem]`.
    pub fn list_of(elem: Self) -> Self {
        Self::Generic {
            name: "list".to_string(),
            args: vec![elem],
        }
    }

    /// Shorthand for `inner | None`.
    pub fn optional(inner: Self) -> Self {
        Self::Union(vec![inner, Self::None])
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Name(name) => f.write_str(name),
            Self::Generic { name, args } => {
                write!(f, "{}[", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str("]")
            }
            Self::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
        }
    }
}

// --- TOKENIZER ---

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Open,
    Close,
    Comma,
    Pipe,
}

fn tokenize(text: &str) -> AnnotationResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < text.len() {
        let rest = text.get(offset..).unwrap_or_default();
        if rest.trim().is_empty() {
            break;
        }
        let caps = TOKEN_RE
            .captures(rest)
            .ok_or_else(|| AnnotationError::UnexpectedChar {
                text: text.to_string(),
                offset: offset + (rest.len() - rest.trim_start().len()),
            })?;

        let token = if let Some(ident) = caps.get(1) {
            Token::Ident(ident.as_str())
        } else {
            match caps.get(2).map(|m| m.as_str()) {
                Some("[") => Token::Open,
                Some("]") => Token::Close,
                Some(",") => Token::Comma,
                _ => Token::Pipe,
            }
        };
        tokens.push(token);
        offset += caps.get(0).map_or(rest.len(), |m| m.end());
    }

    Ok(tokens)
}

// --- PARSER ---

struct Parser<'t, 'a> {
    text: &'a str,
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'a> Parser<'_, 'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn malformed(&self, reason: &str) -> AnnotationError {
        AnnotationError::Malformed {
            text: self.text.to_string(),
            reason: reason.to_string(),
        }
    }

    fn union(&mut self) -> AnnotationResult<TypeExpr> {
        let mut members = vec![self.term()?];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            members.push(self.term()?);
        }
        Ok(flatten_union(members))
    }

    fn term(&mut self) -> AnnotationResult<TypeExpr> {
        let ident = match self.next() {
            Some(Token::Ident(ident)) => ident,
            Some(_) => return Err(self.malformed("expected a type name")),
            None => return Err(self.malformed("unexpected end of annotation")),
        };
        // `typing.Optional` and `Optional` are the same thing here.
        let name = ident.rsplit('.').next().unwrap_or(ident);

        if self.peek() != Some(&Token::Open) {
            return Ok(bare_name(name));
        }
        self.pos += 1;

        let mut args = vec![self.union()?];
        loop {
            match self.next() {
                Some(Token::Comma) => args.push(self.union()?),
                Some(Token::Close) => break,
                _ => return Err(self.malformed("unclosed '['")),
            }
        }

        match name {
            "Optional" => {
                if args.len() != 1 {
                    return Err(self.malformed("Optional takes exactly one argument"));
                }
                let mut members = args;
                members.push(TypeExpr::None);
                Ok(flatten_union(members))
            }
            "Union" => Ok(flatten_union(args)),
            _ => Ok(TypeExpr::Generic {
                name: normalize_generic(name),
                args,
            }),
        }
    }
}

fn bare_name(name: &str) -> TypeExpr {
    match name {
        "None" | "NoneType" => TypeExpr::None,
        "List" | "Dict" | "Tuple" | "Set" => TypeExpr::Name(name.to_lowercase()),
        _ => TypeExpr::Name(name.to_string()),
    }
}

fn normalize_generic(name: &str) -> String {
    match name {
        "List" | "Dict" | "Tuple" | "Set" => name.to_lowercase(),
        _ => name.to_string(),
    }
}

/// Nested unions collapse into one flat member list; a single member is not a union.
fn flatten_union(members: Vec<TypeExpr>) -> TypeExpr {
    let mut flat = Vec::with_capacity(members.len());
    for member in members {
        match member {
            TypeExpr::Union(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    if flat.len() == 1 {
        flat.pop().unwrap_or(TypeExpr::None)
    } else {
        TypeExpr::Union(flat)
    }
}
