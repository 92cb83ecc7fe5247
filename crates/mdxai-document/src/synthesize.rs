//! Post-generation enrichment
//!
//! Turns raw generated text into a display-ready document: linked-data type
//! and context, title/description fallbacks and the fixed `metadata` block.

use crate::body::parse_body;
use crate::document::{merge_values, BodyNode, Document, CONTEXT_KEY, TYPE_KEY};
use crate::frontmatter::has_frontmatter;
use crate::{parse, ParseOptions};
use serde_yaml::{Mapping, Value};

/// Context written when the document carries none
pub const DEFAULT_CONTEXT: &str = "https://schema.org";

/// Version recorded under `metadata.properties.version`
pub const METADATA_VERSION: &str = "1.0";

/// Longest description derived from body text
const MAX_DESCRIPTION_CHARS: usize = 160;

/// Enrich `document` with metadata derived from `type_name`, `model` and the
/// generated `source_text`
///
/// Frontmatter inside `source_text` is merged under the fields already on
/// `document`. Text that cannot be parsed becomes a single text node.
#[must_use]
pub fn synthesize(document: Document, type_name: &str, model: &str, source_text: &str) -> Document {
    let source = source_text.trim();

    let (generated, body) = if has_frontmatter(source) {
        match parse(source, &ParseOptions::default()) {
            Ok(parsed) => (parsed.metadata, parsed.body),
            Err(err) => {
                tracing::warn!(error = %err, "generated frontmatter is unusable, keeping text as one node");
                (Mapping::new(), vec![BodyNode::text(source)])
            }
        }
    } else {
        (Mapping::new(), parse_body(source))
    };

    let fields = match merge_values(Value::Mapping(generated), Value::Mapping(document.metadata)) {
        Value::Mapping(map) => map,
        _ => Mapping::new(),
    };
    let needs_title = !has_text(&fields, "title");
    let needs_description = !has_text(&fields, "description");

    let mut context = None;
    let mut existing = Value::Null;
    let mut rest = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        match key.as_str() {
            Some(CONTEXT_KEY) => context = Some(value),
            Some(TYPE_KEY) => {}
            Some("metadata") => existing = value,
            _ => rest.push((key, value)),
        }
    }
    let context = context
        .filter(|v| v.as_str().is_some_and(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| Value::String(DEFAULT_CONTEXT.to_string()));

    let mut metadata = Mapping::with_capacity(rest.len() + 5);
    metadata.insert(Value::String(TYPE_KEY.into()), Value::String(type_name.into()));
    metadata.insert(Value::String(CONTEXT_KEY.into()), context);

    if needs_title {
        if let Some(title) = first_heading(&body) {
            metadata.insert(Value::String("title".into()), Value::String(title));
        }
    }
    if needs_description {
        if let Some(description) = first_paragraph(&body) {
            metadata.insert(Value::String("description".into()), Value::String(description));
        }
    }
    for (key, value) in rest {
        metadata.insert(key, value);
    }

    let fixed = fixed_metadata(type_name, model);
    let block = match existing {
        Value::Mapping(_) => merge_values(existing, fixed),
        _ => fixed,
    };
    metadata.insert(Value::String("metadata".into()), block);

    Document { metadata, body }
}

/// `{keywords, category, properties: {version, generator}}`
fn fixed_metadata(type_name: &str, model: &str) -> Value {
    let keywords = vec![
        Value::String(type_name.to_lowercase()),
        Value::String("mdx".into()),
        Value::String("ai-generated".into()),
    ];

    let mut properties = Mapping::new();
    properties.insert(
        Value::String("version".into()),
        Value::String(METADATA_VERSION.into()),
    );
    properties.insert(
        Value::String("generator".into()),
        Value::String(format!("mdxai/{model}")),
    );

    let mut block = Mapping::new();
    block.insert(Value::String("keywords".into()), Value::Sequence(keywords));
    block.insert(Value::String("category".into()), Value::String(type_name.into()));
    block.insert(Value::String("properties".into()), Value::Mapping(properties));
    Value::Mapping(block)
}

fn has_text(fields: &Mapping, key: &str) -> bool {
    fields
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn first_heading(body: &[BodyNode]) -> Option<String> {
    body.iter().find_map(|node| match node {
        BodyNode::Heading { text, .. } if !text.is_empty() => Some(text.clone()),
        _ => None,
    })
}

fn first_paragraph(body: &[BodyNode]) -> Option<String> {
    let value = body.iter().find_map(|node| match node {
        BodyNode::Text { value } if !value.trim().is_empty() => Some(value.as_str()),
        _ => None,
    })?;

    let line = value.lines().next().unwrap_or("").trim();
    if line.chars().count() <= MAX_DESCRIPTION_CHARS {
        return Some(line.to_string());
    }
    let cut: String = line.chars().take(MAX_DESCRIPTION_CHARS).collect();
    Some(format!("{}...", cut.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesize_plain_markdown() {
        let doc = synthesize(Document::new(), "Article", "gpt-4o", "# Testing\nBody text");

        assert_eq!(doc.type_name(), Some("Article"));
        assert_eq!(doc.context(), Some(DEFAULT_CONTEXT));
        assert_eq!(doc.title(), Some("Testing"));
        assert_eq!(doc.description(), Some("Body text"));
        assert_eq!(doc.headings().collect::<Vec<_>>(), vec![(1, "Testing")]);
        assert_eq!(
            doc.get_path("metadata.properties.generator"),
            Some(&Value::String("mdxai/gpt-4o".into()))
        );
        assert_eq!(
            doc.get_path("metadata.category"),
            Some(&Value::String("Article".into()))
        );
    }

    #[test]
    fn generated_frontmatter_is_merged() {
        let text = "---\ntitle: From Model\ndescription: Model summary\n$type: Wrong\n---\n\n# Heading\n";
        let doc = synthesize(Document::new(), "BlogPost", "m", text);

        assert_eq!(doc.type_name(), Some("BlogPost"));
        assert_eq!(doc.title(), Some("From Model"));
        assert_eq!(doc.description(), Some("Model summary"));
        assert_eq!(doc.body, vec![BodyNode::heading(1, "Heading")]);
    }

    #[test]
    fn existing_fields_win_over_generated() {
        let mut doc = Document::new();
        doc.set("title", Value::String("Caller Title".into()));
        let text = "---\ntitle: Model Title\n---\nBody";

        let doc = synthesize(doc, "Article", "m", text);
        assert_eq!(doc.title(), Some("Caller Title"));
    }

    #[test]
    fn broken_frontmatter_becomes_single_text_node() {
        let text = "---\ntitle: [unclosed\n---\n# Heading";
        let doc = synthesize(Document::new(), "Article", "m", text);

        assert_eq!(doc.body.len(), 1);
        assert_eq!(doc.body[0], BodyNode::text(text));
        assert_eq!(doc.type_name(), Some("Article"));
    }

    #[test]
    fn long_description_is_truncated() {
        let long = "word ".repeat(100);
        let doc = synthesize(Document::new(), "Article", "m", &long);
        let description = doc.description().unwrap();
        assert!(description.ends_with("..."));
        assert!(description.chars().count() <= MAX_DESCRIPTION_CHARS + 3);
    }

    #[test]
    fn type_and_context_lead_the_metadata() {
        let doc = synthesize(Document::new(), "Article", "m", "Text");
        let keys: Vec<_> = doc.metadata.keys().filter_map(Value::as_str).collect();
        assert_eq!(&keys[..2], &["$type", "$context"]);
        assert_eq!(keys.last(), Some(&"metadata"));
    }
}
