//! mdxai generation engine
//!
//! Two entry points share one [`Backend`]:
//! - [`Generator`] turns a prompt into a synthesized MDX document, optionally
//!   planning an outline first
//! - [`Registry`] runs typed AI functions described by specification files
//!
//! ```rust,no_run
//! use mdxai_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> mdxai_core::Result<()> {
//! let config = MdxaiConfig::new().with_api_key("sk-...");
//! let backend = Arc::new(OpenAiBackend::from_config(&config.api)?);
//! let generator = Generator::new(backend, config);
//!
//! let result = generator
//!     .generate(&GenerationRequest::new("testing").with_type("Article"))
//!     .await?;
//! println!("{}", result.content);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod generator;
pub mod outline;
pub mod prompts;
pub mod registry;
pub mod timeout;
pub mod types;

pub use backend::{Backend, OpenAiBackend, StructuredRequest, TextRequest, TextResponse, TextStream};
pub use config::MdxaiConfig;
pub use error::{MdxaiError, Result};
pub use generator::Generator;
pub use registry::{AiFunction, FunctionResult, Registry, Specification};
pub use types::{GenerationRequest, GenerationResult, OutlineItem};

/// Prelude for common imports
pub mod prelude {
    pub use crate::backend::{Backend, OpenAiBackend};
    pub use crate::config::MdxaiConfig;
    pub use crate::error::{MdxaiError, Result};
    pub use crate::generator::Generator;
    pub use crate::registry::{FunctionResult, Registry};
    pub use crate::types::{GenerationRequest, GenerationResult, OutlineItem};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
