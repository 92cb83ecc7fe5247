//! mdxai document synthesizer
//!
//! Bidirectional mapping between serialized MDX text and the canonical
//! in-memory [`Document`].
//!
//! # Core Operations
//!
//! - **Parse**: text → [`Document`] (`---` delimited YAML metadata + body nodes)
//! - **Synthesize**: generated text → enriched [`Document`] with linked-data metadata
//! - **Stringify**: [`Document`] → text, writing both `$` and `@` key spellings
//!
//! # Example
//!
//! ```rust
//! use mdxai_document::{parse, stringify, ParseOptions, StringifyOptions};
//!
//! let text = "---\n$type: Article\ntitle: Hello\n---\n\n# Hello\n";
//! let doc = parse(text, &ParseOptions::default()).unwrap();
//! assert_eq!(doc.type_name(), Some("Article"));
//!
//! let out = stringify(&doc, &StringifyOptions::default()).unwrap();
//! assert!(out.contains("'@type': Article"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod body;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod synthesize;

pub use body::{parse_body, render_body};
pub use document::{BodyNode, Document, CONTEXT_KEY, TYPE_KEY};
pub use error::{ParseError, SerializeError};
pub use synthesize::{synthesize, DEFAULT_CONTEXT, METADATA_VERSION};

/// Options for [`parse`]
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Accept `@`-prefixed keys as equivalent to `$`-prefixed ones
    pub allow_alt_prefix: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_alt_prefix: true,
        }
    }
}

impl ParseOptions {
    /// Treat `@`-prefixed keys as ordinary keys
    #[inline]
    #[must_use]
    pub fn strict_prefix(mut self) -> Self {
        self.allow_alt_prefix = false;
        self
    }
}

/// Options for [`stringify`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StringifyOptions {
    /// Write the `@` spelling first
    pub use_alt_prefix: bool,
}

impl StringifyOptions {
    /// Write the `@` spelling first
    #[inline]
    #[must_use]
    pub fn alt_prefix(mut self) -> Self {
        self.use_alt_prefix = true;
        self
    }
}

/// Parse text into a document
///
/// # Errors
/// - `ParseError::MissingFrontmatter` if text does not open with `---`
/// - `ParseError::UnterminatedFrontmatter` if the closing `---` is missing
/// - `ParseError::InvalidMetadata` if the block is not a YAML mapping
pub fn parse(text: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let (yaml, body) = frontmatter::split(text)?;
    let metadata = frontmatter::decode(yaml, options.allow_alt_prefix)?;
    Ok(Document {
        metadata,
        body: parse_body(body),
    })
}

/// Serialize a document back into text
///
/// # Errors
/// Returns `SerializeError::Yaml` if the metadata cannot be encoded.
pub fn stringify(document: &Document, options: &StringifyOptions) -> Result<String, SerializeError> {
    let yaml = frontmatter::encode(&document.metadata, options.use_alt_prefix)?;
    let body = render_body(&document.body);

    let mut out = String::with_capacity(yaml.len() + body.len() + 16);
    out.push_str(frontmatter::DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    out.push_str(frontmatter::DELIMITER);
    out.push('\n');
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
    Ok(out)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
