//! mdxai schema translator
//!
//! Converts JSON-Schema-like descriptions into:
//! - a structural [`Validator`] for generated values
//! - an [`OutputShape`] telling the backend what to produce
//!
//! ```rust
//! use mdxai_schema::{CompiledSchema, OutputShape};
//! use serde_json::json;
//!
//! let schema = json!({"type": "array", "items": {"type": "string"}});
//! let compiled = CompiledSchema::compile(Some(&schema));
//! assert_eq!(compiled.shape(), OutputShape::Array);
//! assert!(compiled.validate(&json!(["a", "b"])).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod compile;
pub mod error;
pub mod validator;

pub use compile::{select_shape, translate, CompiledSchema};
pub use error::ValidationError;
pub use validator::{json_type, Validator};

use serde::{Deserialize, Serialize};

/// How a structured-generation result is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// Single validated object
    Object,
    /// Validated homogeneous sequence
    Array,
    /// Unconstrained text
    Freeform,
}

impl OutputShape {
    /// Lowercase name (`object`, `array`, `freeform`)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Freeform => "freeform",
        }
    }
}

impl std::fmt::Display for OutputShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
