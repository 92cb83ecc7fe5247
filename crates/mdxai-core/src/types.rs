//! Request and result types for document generation

use mdxai_document::Document;
use serde::{Deserialize, Serialize};

/// Outline depth used when a request does not set one
pub const DEFAULT_DEPTH: u32 = 1;

/// Immutable description of one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Topic or instructions
    pub prompt: String,
    /// Document type; falls back to the configured default
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Model identifier; falls back to the configured default
    pub model: Option<String>,
    /// Component names the document may use
    pub components: Vec<String>,
    /// Generate an outline first, then expand it
    pub recursive: bool,
    /// Outline depth hint
    pub depth: u32,
}

impl GenerationRequest {
    /// Create a direct (non-recursive) request
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            type_name: None,
            model: None,
            components: Vec::new(),
            recursive: false,
            depth: DEFAULT_DEPTH,
        }
    }

    /// With document type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// With model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// With available components
    #[inline]
    #[must_use]
    pub fn with_components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = components.into_iter().map(Into::into).collect();
        self
    }

    /// Enable outline-then-expand generation
    #[inline]
    #[must_use]
    pub fn recursive(mut self, depth: u32) -> Self {
        self.recursive = true;
        self.depth = depth;
        self
    }

    /// Whether the outline stage runs
    #[inline]
    #[must_use]
    pub fn wants_outline(&self) -> bool {
        self.recursive && self.depth > 0
    }
}

/// One outline entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    /// Section title
    pub title: String,
    /// Short summary of the section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nested sections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<OutlineItem>>,
}

impl OutlineItem {
    /// Create item with title only
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            children: None,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Outcome of one generation call
///
/// `content` is always the serialization of `document`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    /// Serialized document
    pub content: String,
    /// Synthesized document
    pub document: Document,
    /// Outline, when the outline stage ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<OutlineItem>>,
}
