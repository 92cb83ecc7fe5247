//! In-memory document model
//!
//! A [`Document`] is an ordered metadata map plus an ordered sequence of
//! [`BodyNode`]s. Linked-data keys are stored under the `$` prefix; the `@`
//! spelling is accepted on input and written back out on serialization.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;

/// Canonical prefix for linked-data keys (`$type`, `$context`, ...)
pub const PRIMARY_PREFIX: char = '$';

/// Alternate prefix accepted as an equivalent spelling (`@type`, `@context`, ...)
pub const ALT_PREFIX: char = '@';

/// Canonical type key
pub const TYPE_KEY: &str = "$type";

/// Canonical context key
pub const CONTEXT_KEY: &str = "$context";

/// Map a key to its canonical spelling (`@name` → `$name`)
#[must_use]
pub fn canonical_key(key: &str) -> Cow<'_, str> {
    match key.strip_prefix(ALT_PREFIX) {
        Some(rest) if !rest.is_empty() => Cow::Owned(format!("{PRIMARY_PREFIX}{rest}")),
        _ => Cow::Borrowed(key),
    }
}

/// Alternate spelling of a canonical linked-data key (`$name` → `@name`)
#[must_use]
pub fn alternate_key(key: &str) -> Option<String> {
    match key.strip_prefix(PRIMARY_PREFIX) {
        Some(rest) if !rest.is_empty() => Some(format!("{ALT_PREFIX}{rest}")),
        _ => None,
    }
}

/// Block of body content
///
/// Order within [`Document::body`] is significant and preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyNode {
    /// ATX heading (`#` .. `######`)
    Heading {
        /// Heading level (1-6)
        depth: u8,
        /// Heading text as written
        text: String,
    },
    /// Any other markdown block, kept as source
    Text {
        /// Markdown source
        value: String,
    },
    /// Embedded JSX-style component (`<Chart ... />`)
    Component {
        /// Component name
        name: String,
        /// Full component source
        source: String,
    },
    /// Fenced code block
    Code {
        /// Info string language, if any
        lang: Option<String>,
        /// Code content (newline terminated)
        value: String,
    },
    /// Horizontal rule
    ThematicBreak,
}

impl BodyNode {
    /// Create heading node
    #[must_use]
    pub fn heading(depth: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            depth: depth.clamp(1, 6),
            text: text.into(),
        }
    }

    /// Create text node
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    /// Create code node
    #[must_use]
    pub fn code(lang: Option<&str>, value: impl Into<String>) -> Self {
        let mut value = value.into();
        if !value.ends_with('\n') {
            value.push('\n');
        }
        Self::Code {
            lang: lang.map(str::to_string),
            value,
        }
    }

    /// Short tag naming the node kind
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Heading { .. } => "heading",
            Self::Text { .. } => "text",
            Self::Component { .. } => "component",
            Self::Code { .. } => "code",
            Self::ThematicBreak => "thematic_break",
        }
    }

    /// Render node back to markdown source
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Heading { depth, text } => {
                format!("{} {}", "#".repeat(usize::from(*depth)), text)
            }
            Self::Text { value } => value.clone(),
            Self::Component { source, .. } => source.clone(),
            Self::Code { lang, value } => {
                let mut out = format!("```{}\n", lang.as_deref().unwrap_or(""));
                out.push_str(value);
                if !value.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("```");
                out
            }
            Self::ThematicBreak => "***".to_string(),
        }
    }
}

/// Canonical document: metadata map plus ordered body nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Frontmatter metadata (linked-data keys in canonical `$` form)
    pub metadata: Mapping,
    /// Body content in source order
    pub body: Vec<BodyNode>,
}

impl Document {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create document with a type identifier
    #[must_use]
    pub fn with_type(type_name: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.set(TYPE_KEY, Value::String(type_name.into()));
        doc
    }

    /// Append a body node
    #[must_use]
    pub fn with_node(mut self, node: BodyNode) -> Self {
        self.body.push(node);
        self
    }

    /// Type identifier, under either prefix
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// Context identifier, under either prefix
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.get(CONTEXT_KEY).and_then(Value::as_str)
    }

    /// Document title
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }

    /// Document description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.get("description").and_then(Value::as_str)
    }

    /// Get top-level metadata value; `@key` and `$key` are equivalent
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata
            .get(Value::String(canonical_key(key).into_owned()))
    }

    /// Set top-level metadata value under its canonical key
    pub fn set(&mut self, key: &str, value: Value) {
        self.metadata
            .insert(Value::String(canonical_key(key).into_owned()), value);
    }

    /// Remove top-level metadata value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.metadata
            .remove(Value::String(canonical_key(key).into_owned()))
    }

    /// Get nested metadata value (dot notation, e.g. `metadata.properties.version`)
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            match current {
                Value::Mapping(map) => current = map.get(Value::String(segment.to_string()))?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Headings in body order
    pub fn headings(&self) -> impl Iterator<Item = (u8, &str)> {
        self.body.iter().filter_map(|node| match node {
            BodyNode::Heading { depth, text } => Some((*depth, text.as_str())),
            _ => None,
        })
    }
}

/// Merge two YAML values recursively
///
/// Values from `overlay` take precedence.
#[must_use]
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                let entry = base_map.entry(key).or_insert(Value::Null);
                *entry = merge_values(entry.clone(), value);
            }
            Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}
