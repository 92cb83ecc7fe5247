//! Structural validators
//!
//! A [`Validator`] mirrors the subset of JSON Schema the translator
//! understands. Validation returns the conformed value: object properties are
//! kept in declaration order and undeclared properties are dropped.

use crate::error::ValidationError;
use serde_json::{json, Map, Value};

/// Runtime validator for one schema node
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Accept anything (untyped or unrecognized schema)
    Any,
    /// JSON string
    String,
    /// Any JSON number
    Number,
    /// Number without fractional part
    Integer,
    /// JSON boolean
    Boolean,
    /// Homogeneous sequence
    Array(Box<Validator>),
    /// Object requiring exactly the declared properties
    Object(Vec<(String, Validator)>),
    /// Object with no declared properties, kept as-is
    Record,
}

impl Validator {
    /// Validate `value`, returning the conformed copy
    ///
    /// # Errors
    /// Returns the first mismatch found in depth-first order.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<Value, ValidationError> {
        match (self, value) {
            (Self::Any, v) => Ok(v.clone()),
            (Self::String, v @ Value::String(_)) | (Self::Boolean, v @ Value::Bool(_)) => {
                Ok(v.clone())
            }
            (Self::Number, v @ Value::Number(_)) => Ok(v.clone()),
            (Self::Integer, Value::Number(n)) if is_integral(n) => Ok(Value::Number(n.clone())),
            (Self::Array(item), Value::Array(values)) => values
                .iter()
                .enumerate()
                .map(|(i, v)| item.validate_at(v, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (Self::Object(properties), Value::Object(map)) => {
                let mut out = Map::with_capacity(properties.len());
                for (name, validator) in properties {
                    let Some(field) = map.get(name) else {
                        return Err(ValidationError::MissingProperty {
                            path: path.to_string(),
                            property: name.clone(),
                        });
                    };
                    let conformed = validator.validate_at(field, &format!("{path}.{name}"))?;
                    out.insert(name.clone(), conformed);
                }
                Ok(Value::Object(out))
            }
            (Self::Record, v @ Value::Object(_)) => Ok(v.clone()),
            (expected, found) => Err(ValidationError::TypeMismatch {
                path: path.to_string(),
                expected: expected.type_name(),
                found: json_type(found),
            }),
        }
    }

    /// Name of the JSON type this validator accepts
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) | Self::Record => "object",
        }
    }

    /// Normalized JSON Schema for this validator
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::Any => json!({}),
            Self::Array(item) => json!({ "type": "array", "items": item.to_json_schema() }),
            Self::Object(properties) => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, v)| (name.clone(), v.to_json_schema()))
                    .collect();
                let required: Vec<&str> = properties.iter().map(|(n, _)| n.as_str()).collect();
                json!({
                    "type": "object",
                    "properties": props,
                    "required": required,
                    "additionalProperties": false,
                })
            }
            scalar => json!({ "type": scalar.type_name() }),
        }
    }
}

fn is_integral(n: &serde_json::Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

/// JSON type name of a value
#[must_use]
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
