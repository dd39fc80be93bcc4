// src/core/converters.rs

use crate::core::parameters::{ParamType, Parameter, Scalar};
use crate::models::Value;
use thiserror::Error;

/// A command-line token that does not fit its parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value '{token}' for '{param}': expected {expected}")]
pub struct ConversionError {
    pub param: String,
    pub token: String,
    pub expected: String,
}

pub type ConversionResult<T> = Result<T, ConversionError>;

fn fail(param: &str, token: &str, expected: impl Into<String>) -> ConversionError {
    ConversionError {
        param: param.to_string(),
        token: token.to_string(),
        expected: expected.into(),
    }
}

/// Converts one token into a scalar value.
pub fn convert_scalar(param: &str, token: &str, scalar: Scalar) -> ConversionResult<Value> {
    match scalar {
        Scalar::Str => Ok(Value::Str(token.to_string())),
        Scalar::Int => token
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| fail(param, token, scalar.name())),
        Scalar::Float => token
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| fail(param, token, scalar.name())),
    }
}

/// Parses the usual spellings of a boolean.
pub fn convert_bool(param: &str, token: &str) -> ConversionResult<Value> {
    match token.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
        _ => Err(fail(param, token, "bool")),
    }
}

fn check_choice(param: &Parameter, token: &str) -> ConversionResult<()> {
    let choices = &param.options.choices;
    if choices.is_empty() || choices.iter().any(|choice| choice == token) {
        return Ok(());
    }
    Err(fail(
        &param.name,
        token,
        format!("one of: {}", choices.join(", ")),
    ))
}

/// Converts a single token for `param`, honoring its choices.
pub fn convert_token(param: &Parameter, token: &str) -> ConversionResult<Value> {
    log::trace!("Converting '{}' for parameter '{}'", token, param.name);
    match &param.ty {
        ParamType::Bool => convert_bool(&param.name, token),
        ParamType::Unsupported(ty) => Err(fail(
            &param.name,
            token,
            format!("{} (not settable from the command line)", ty),
        )),
        ty => {
            check_choice(param, token)?;
            let scalar = ty.token_scalar().unwrap_or(Scalar::Str);
            convert_scalar(&param.name, token, scalar)
        }
    }
}

/// Converts every token of a multi-valued parameter into a list.
pub fn convert_tokens<'a, I>(param: &Parameter, tokens: I) -> ConversionResult<Value>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .map(|token| convert_token(param, token))
        .collect::<ConversionResult<Vec<_>>>()
        .map(Value::List)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::Param;

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(convert_scalar("n", "42", Scalar::Int).unwrap(), Value::Int(42));
        assert_eq!(convert_scalar("n", "-3", Scalar::Int).unwrap(), Value::Int(-3));
        assert_eq!(
            convert_scalar("x", "2.5", Scalar::Float).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            convert_scalar("s", "text", Scalar::Str).unwrap(),
            Value::from("text")
        );
    }

    #[test]
    fn test_failure_names_token_and_type() {
        let err = convert_scalar("a", "xxxx", Scalar::Int).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("xxxx"));
        assert!(message.contains("int"));
        assert_eq!(err.param, "a");
    }

    #[test]
    fn test_list_conversion_stops_at_first_bad_token() {
        let param = Param::positional("nums").annotation("list[int]").build().unwrap();
        assert_eq!(
            convert_tokens(&param, ["1", "2"]).unwrap(),
            Value::from(vec![1, 2])
        );
        let err = convert_tokens(&param, ["1", "two", "x"]).unwrap_err();
        assert_eq!(err.token, "two");
    }

    #[test]
    fn test_untyped_is_a_string() {
        let param = Param::positional("anything").build().unwrap();
        assert_eq!(convert_token(&param, "12").unwrap(), Value::from("12"));
    }

    #[test]
    fn test_choices_are_enforced() {
        let param = Param::keyword("mode")
            .default("fast")
            .choices(["fast", "slow"])
            .build()
            .unwrap();
        assert!(convert_token(&param, "slow").is_ok());
        let err = convert_token(&param, "medium").unwrap_err();
        assert!(err.expected.contains("fast, slow"));
    }

    #[test]
    fn test_bool_spellings() {
        assert_eq!(convert_bool("f", "Yes").unwrap(), Value::Bool(true));
        assert_eq!(convert_bool("f", "0").unwrap(), Value::Bool(false));
        assert!(convert_bool("f", "maybe").is_err());
    }
}
