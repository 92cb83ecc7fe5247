//! Frontmatter block handling
//!
//! Splits `---` delimited YAML metadata from body text, decodes it into a
//! canonical mapping and encodes it back with both prefix spellings.

use crate::document::{alternate_key, canonical_key, TYPE_KEY};
use crate::error::{ParseError, SerializeError};
use serde_yaml::{Mapping, Value};

/// Marker line opening and closing the metadata block
pub const DELIMITER: &str = "---";

/// Whether text opens with a frontmatter delimiter line
#[must_use]
pub fn has_frontmatter(text: &str) -> bool {
    opening(text).is_some()
}

/// Text after the opening delimiter line, if present
fn opening(text: &str) -> Option<&str> {
    let text = text.trim_start_matches('\u{feff}');
    let rest = text.strip_prefix(DELIMITER)?;
    let (line_rest, after) = match rest.find('\n') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };
    line_rest.trim().is_empty().then_some(after)
}

/// Split text into `(yaml, body)`
pub(crate) fn split(text: &str) -> Result<(&str, &str), ParseError> {
    let rest = opening(text).ok_or(ParseError::MissingFrontmatter)?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Ok((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(ParseError::UnterminatedFrontmatter)
}

/// Decode YAML into a canonical mapping
pub(crate) fn decode(yaml: &str, allow_alt_prefix: bool) -> Result<Mapping, ParseError> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }

    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|e| ParseError::invalid_metadata(format!("YAML parse error: {e}")))?;

    match value {
        Value::Mapping(map) => Ok(canonicalize(map, allow_alt_prefix)),
        Value::Null => Ok(Mapping::new()),
        other => Err(ParseError::invalid_metadata(format!(
            "expected a mapping, got {}",
            kind_of(&other)
        ))),
    }
}

/// Fold `@key` entries into `$key`, keeping first-seen position
///
/// When both spellings are present the `$` value wins.
pub(crate) fn canonicalize(map: Mapping, allow_alt_prefix: bool) -> Mapping {
    let mut out = Mapping::with_capacity(map.len());

    for (key, value) in map {
        let Value::String(name) = &key else {
            out.insert(key, value);
            continue;
        };

        if !allow_alt_prefix {
            out.insert(key, value);
            continue;
        }

        let canonical = Value::String(canonical_key(name).into_owned());
        let is_alt = canonical.as_str() != Some(name.as_str());
        match out.get_mut(&canonical) {
            // `$key` already recorded, alternate spelling loses
            Some(_) if is_alt => {}
            Some(slot) => *slot = value,
            None => {
                out.insert(canonical, value);
            }
        }
    }

    if let Some(Value::String(type_name)) = out.get_mut(TYPE_KEY) {
        let stripped = strip_quotes(type_name).to_string();
        if stripped != *type_name {
            *type_name = stripped;
        }
    }

    out
}

/// Encode a canonical mapping, writing both spellings of prefixed keys
pub(crate) fn encode(metadata: &Mapping, use_alt_prefix: bool) -> Result<String, SerializeError> {
    let mut out = Mapping::with_capacity(metadata.len() * 2);

    for (key, value) in metadata {
        let alternate = key.as_str().and_then(alternate_key);
        match alternate {
            Some(alt) if use_alt_prefix => {
                out.insert(Value::String(alt), value.clone());
                out.insert(key.clone(), value.clone());
            }
            Some(alt) => {
                out.insert(key.clone(), value.clone());
                out.insert(Value::String(alt), value.clone());
            }
            None => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    if out.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_yaml::to_string(&out)?)
}

/// Strip one layer of matching surrounding quotes
fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
