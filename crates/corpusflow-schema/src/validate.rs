//! Validates a resolved config value against the constraints carried on a
//! [`ConfigParamSpec`]: type, `choices`, `min`/`max`, and `pattern`.
//!
//! This is deliberately narrower than general JSON Schema validation (no
//! `$ref`, no `allOf`/`oneOf`) — the schema this workspace generates never
//! nests deeper than module → key, so a hand-rolled check on the leaf spec
//! is simpler than pulling in a general validator crate for five rules.

use corpusflow_types::ConfigParamSpec;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{key}: expected {expected}, got {actual}")]
    WrongType { key: String, expected: &'static str, actual: String },
    #[error("{key}: {value} is not one of the allowed choices")]
    NotInChoices { key: String, value: Value },
    #[error("{key}: {value} is below the minimum of {min}")]
    BelowMinimum { key: String, value: f64, min: f64 },
    #[error("{key}: {value} is above the maximum of {max}")]
    AboveMaximum { key: String, value: f64, max: f64 },
    #[error("{key}: {value:?} does not match pattern {pattern}")]
    PatternMismatch { key: String, value: String, pattern: String },
    #[error("{key}: invalid regex pattern {pattern:?}: {source}")]
    InvalidPattern { key: String, pattern: String, source: regex::Error },
}

/// Validates `value` against `spec`'s declared constraints. `key` is the
/// dotted path used in error messages (e.g. `segment.token_regex`).
pub fn validate(key: &str, value: &Value, spec: &ConfigParamSpec) -> Result<(), ValidationError> {
    if let Some(default) = &spec.default {
        check_type(key, value, default)?;
    }
    if !spec.choices.is_empty() && !spec.choices.contains(value) {
        return Err(ValidationError::NotInChoices { key: key.to_string(), value: value.clone() });
    }
    if let Value::Number(n) = value {
        let n = n.as_f64().unwrap_or(f64::NAN);
        if let Some(min) = spec.min {
            if n < min {
                return Err(ValidationError::BelowMinimum { key: key.to_string(), value: n, min });
            }
        }
        if let Some(max) = spec.max {
            if n > max {
                return Err(ValidationError::AboveMaximum { key: key.to_string(), value: n, max });
            }
        }
    }
    if let (Some(pattern), Value::String(s)) = (&spec.pattern, value) {
        let re = Regex::new(pattern).map_err(|source| ValidationError::InvalidPattern {
            key: key.to_string(),
            pattern: pattern.clone(),
            source,
        })?;
        if !re.is_match(s) {
            return Err(ValidationError::PatternMismatch {
                key: key.to_string(),
                value: s.clone(),
                pattern: pattern.clone(),
            });
        }
    }
    Ok(())
}

fn check_type(key: &str, value: &Value, default: &Value) -> Result<(), ValidationError> {
    let matches = match (default, value) {
        (Value::String(_), Value::String(_)) => true,
        (Value::Bool(_), Value::Bool(_)) => true,
        (Value::Number(_), Value::Number(_)) => true,
        (Value::Array(_), Value::Array(_)) => true,
        (Value::Object(_), Value::Object(_)) => true,
        (Value::Null, _) => true,
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(ValidationError::WrongType {
            key: key.to_string(),
            expected: type_name(default),
            actual: type_name(value),
        })
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
