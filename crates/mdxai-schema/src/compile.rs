//! Schema translation
//!
//! Recursive descent over a JSON-Schema-like tree. Coverage is partial on
//! purpose: shapes the translator does not recognize widen to
//! [`Validator::Any`] instead of failing.

use crate::error::ValidationError;
use crate::validator::Validator;
use crate::OutputShape;
use serde_json::Value;

/// Type names accepted in shorthand schemas (`{content: string}`)
const SCALAR_NAMES: &[&str] = &["string", "number", "integer", "boolean"];

/// Schema compiled once per specification
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    shape: OutputShape,
    validator: Option<Validator>,
    source: Option<Value>,
}

impl CompiledSchema {
    /// Compile an optional schema; `None` and JSON `null` both mean "no schema"
    #[must_use]
    pub fn compile(schema: Option<&Value>) -> Self {
        let schema = schema.filter(|s| !s.is_null());
        Self {
            shape: select_shape(schema),
            validator: schema.map(translate_root),
            source: schema.cloned(),
        }
    }

    /// Schema that selects the `freeform` shape
    #[must_use]
    pub fn freeform() -> Self {
        Self::compile(None)
    }

    /// Selected output shape
    #[inline]
    #[must_use]
    pub fn shape(&self) -> OutputShape {
        self.shape
    }

    /// Compiled validator (`None` for freeform)
    #[inline]
    #[must_use]
    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    /// Schema as supplied
    #[inline]
    #[must_use]
    pub fn source(&self) -> Option<&Value> {
        self.source.as_ref()
    }

    /// Normalized JSON Schema to hand to a structured-output backend
    #[must_use]
    pub fn json_schema(&self) -> Option<Value> {
        self.validator.as_ref().map(Validator::to_json_schema)
    }

    /// Validate a generated value
    ///
    /// Freeform schemas accept any value unchanged.
    ///
    /// # Errors
    /// Returns the first structural mismatch.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        match &self.validator {
            Some(validator) => validator.validate(value),
            None => Ok(value.clone()),
        }
    }
}

/// Output-shape selection rule
///
/// No schema → `Freeform`; top-level `type: array` → `Array`; otherwise `Object`.
#[must_use]
pub fn select_shape(schema: Option<&Value>) -> OutputShape {
    match schema {
        None => OutputShape::Freeform,
        Some(s) if s.get("type").and_then(Value::as_str) == Some("array") => OutputShape::Array,
        Some(_) => OutputShape::Object,
    }
}

/// Translate the top-level schema, accepting the `{name: type}` shorthand
fn translate_root(schema: &Value) -> Validator {
    if let Some(map) = schema.as_object() {
        let is_shorthand = !map.is_empty()
            && !map.contains_key("type")
            && !map.contains_key("properties")
            && !map.contains_key("items")
            && map.values().all(|v| match v {
                Value::String(name) => SCALAR_NAMES.contains(&name.as_str()),
                Value::Object(_) => true,
                _ => false,
            });
        if is_shorthand {
            return Validator::Object(
                map.iter()
                    .map(|(name, v)| (name.clone(), translate(v)))
                    .collect(),
            );
        }
    }
    translate(schema)
}

/// Translate one schema node
#[must_use]
pub fn translate(schema: &Value) -> Validator {
    match schema {
        Value::String(name) => scalar(name).unwrap_or(Validator::Any),
        Value::Object(map) => {
            let declared = map.get("type").and_then(Value::as_str);
            match declared {
                Some("object") => object(map.get("properties")),
                Some("array") => array(map.get("items")),
                Some(name) => scalar(name).unwrap_or(Validator::Any),
                None if map.contains_key("properties") => object(map.get("properties")),
                None if map.contains_key("items") => array(map.get("items")),
                None => Validator::Any,
            }
        }
        _ => Validator::Any,
    }
}

fn scalar(name: &str) -> Option<Validator> {
    match name {
        "string" => Some(Validator::String),
        "number" => Some(Validator::Number),
        "integer" => Some(Validator::Integer),
        "boolean" => Some(Validator::Boolean),
        _ => None,
    }
}

fn object(properties: Option<&Value>) -> Validator {
    match properties.and_then(Value::as_object) {
        Some(props) => Validator::Object(
            props
                .iter()
                .map(|(name, schema)| (name.clone(), translate(schema)))
                .collect(),
        ),
        None => Validator::Record,
    }
}

fn array(items: Option<&Value>) -> Validator {
    Validator::Array(Box::new(items.map_or(Validator::Any, translate)))
}
