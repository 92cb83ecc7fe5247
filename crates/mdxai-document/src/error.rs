//! Error types for the document synthesizer
//!
//! Covers the two directions of the text ⇄ document mapping:
//! - Parse operations (text → Document)
//! - Serialize operations (Document → text)

/// Errors while decoding text into a [`Document`](crate::Document)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Text does not open with a `---` delimited metadata block
    #[error("no frontmatter block found: expected text to start with '---'")]
    MissingFrontmatter,

    /// Opening delimiter present but the closing `---` line is missing
    #[error("unterminated frontmatter block: no closing '---' line")]
    UnterminatedFrontmatter,

    /// Metadata block is not valid YAML or is not a mapping
    #[error("invalid frontmatter metadata: {0}")]
    InvalidMetadata(String),
}

impl ParseError {
    /// Create invalid metadata error
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata(message.into())
    }
}

/// Errors while encoding a [`Document`](crate::Document) back into text
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// YAML encoder rejected the metadata map
    #[error("failed to encode frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
