//! Outline extraction from model output

use crate::error::{MdxaiError, Result};
use crate::types::OutlineItem;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Fenced block, optionally tagged `json`
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").expect("valid regex"));

/// Strip a surrounding code fence, if any
///
/// Text that opens and closes with two separate fenced blocks is returned
/// unchanged: an interior fence line means the outer fences are not a pair.
#[must_use]
pub fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match FENCE_RE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) if !has_fence_line(inner.as_str()) => inner.as_str().trim(),
        _ => trimmed,
    }
}

fn has_fence_line(text: &str) -> bool {
    text.lines().any(|line| line.trim_start().starts_with("```"))
}

/// Parse outline text into items
///
/// Accepts a bare JSON array, or an object whose only array-valued field holds
/// the items (`{"sections": [...]}`).
///
/// # Errors
/// Empty text is a generation error; anything that is not an outline is a
/// parsing error.
pub fn parse_outline(text: &str) -> Result<Vec<OutlineItem>> {
    let body = strip_fence(text);
    if body.is_empty() {
        return Err(MdxaiError::generation("model returned an empty outline"));
    }

    let value: Value = serde_json::from_str(body)?;
    let items = match value {
        Value::Array(_) => value,
        Value::Object(map) => {
            let mut arrays = map.into_iter().filter(|(_, v)| v.is_array());
            match (arrays.next(), arrays.next()) {
                (Some((_, items)), None) => items,
                _ => return Err(MdxaiError::parsing("outline object has no single item list")),
            }
        }
        other => {
            return Err(MdxaiError::parsing(format!(
                "outline must be a JSON array, got {}",
                mdxai_schema::json_type(&other)
            )))
        }
    };
    Ok(serde_json::from_value(items)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array() {
        let items = parse_outline(r#"[{"title": "A", "description": "a"}, {"title": "B"}]"#).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description.as_deref(), Some("a"));
    }

    #[test]
    fn fenced_array() {
        let text = "```json\n[{\"title\": \"A\"}]\n```";
        assert_eq!(parse_outline(text).unwrap(), vec![OutlineItem::new("A")]);
    }

    #[test]
    fn separate_leading_and_trailing_blocks_are_kept() {
        let text = "```rust\nfn a() {}\n```\n\nMiddle text\n\n```rust\nfn b() {}\n```";
        assert_eq!(strip_fence(text), text);
        assert_eq!(strip_fence("```mdx\n# Title\n```\n"), "# Title");
    }

    #[test]
    fn wrapped_array() {
        let items = parse_outline(r#"{"sections": [{"title": "A"}]}"#).unwrap();
        assert_eq!(items[0].title, "A");
    }

    #[test]
    fn empty_is_generation_error() {
        assert_eq!(parse_outline("  \n").unwrap_err().kind(), "GenerationError");
        assert_eq!(parse_outline("```json\n```").unwrap_err().kind(), "GenerationError");
    }

    #[test]
    fn malformed_is_parsing_error() {
        assert_eq!(parse_outline("not json").unwrap_err().kind(), "ParsingError");
        assert_eq!(parse_outline("42").unwrap_err().kind(), "ParsingError");
        assert_eq!(parse_outline(r#"[{"name": "no title"}]"#).unwrap_err().kind(), "ParsingError");
    }
}
