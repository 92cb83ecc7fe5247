//! Engine configuration
//!
//! Built with `with_*` builders or loaded from TOML. Environment overrides are
//! applied through [`MdxaiConfig::apply_env`], which takes the variables as an
//! iterator so library code never reads the process environment itself.

use crate::error::{MdxaiError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default document type
pub const DEFAULT_TYPE: &str = "Article";

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MdxaiConfig {
    /// Model used when a request names none
    pub default_model: String,
    /// Document type used when a request names none
    pub default_type: String,
    /// Directory holding function specification files
    pub functions_dir: PathBuf,
    /// Sampling temperature passed to the backend
    pub temperature: Option<f32>,
    /// Token limit passed to the backend
    pub max_tokens: Option<u32>,
    /// Per-step timeout for backend calls, in seconds
    pub step_timeout_secs: u64,
    /// Maximum concurrent generations in a batch
    pub max_concurrency: usize,
    /// Backend connection settings
    pub api: ApiConfig,
}

/// Connection settings for the HTTP backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// Bearer token
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl MdxaiConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// With default document type
    #[inline]
    #[must_use]
    pub fn with_default_type(mut self, type_name: impl Into<String>) -> Self {
        self.default_type = type_name.into();
        self
    }

    /// With functions directory
    #[inline]
    #[must_use]
    pub fn with_functions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.functions_dir = dir.into();
        self
    }

    /// With per-step timeout
    #[inline]
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// With batch concurrency
    #[inline]
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// With API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api.api_key = Some(key.into());
        self
    }

    /// Per-step timeout as a duration
    #[inline]
    #[must_use]
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns a configuration error when the TOML is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MdxaiError::configuration(format!("invalid config: {e}")))
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns an IO error when the file cannot be read, or a configuration
    /// error when it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| MdxaiError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Apply `MDXAI_*` and `OPENAI_*` overrides
    ///
    /// Unparseable numeric values are ignored with a warning.
    #[must_use]
    pub fn apply_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value: String = value.into();
            match key.as_ref() {
                "MDXAI_MODEL" => self.default_model = value,
                "MDXAI_TYPE" => self.default_type = value,
                "MDXAI_FUNCTIONS_DIR" => self.functions_dir = PathBuf::from(value),
                "MDXAI_BASE_URL" | "OPENAI_BASE_URL" => self.api.base_url = value,
                "MDXAI_API_KEY" | "OPENAI_API_KEY" => self.api.api_key = Some(value),
                "MDXAI_TIMEOUT_SECS" => match value.parse() {
                    Ok(secs) => self.step_timeout_secs = secs,
                    Err(_) => tracing::warn!(value = %value, "ignoring invalid MDXAI_TIMEOUT_SECS"),
                },
                "MDXAI_CONCURRENCY" => match value.parse() {
                    Ok(max) => self.max_concurrency = max,
                    Err(_) => tracing::warn!(value = %value, "ignoring invalid MDXAI_CONCURRENCY"),
                },
                _ => {}
            }
        }
        self
    }

    /// Check configuration invariants
    ///
    /// # Errors
    /// Returns a configuration error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.default_model.trim().is_empty() {
            return Err(MdxaiError::configuration("default_model must not be empty"));
        }
        if self.step_timeout_secs == 0 {
            return Err(MdxaiError::configuration("step_timeout_secs must be positive"));
        }
        if self.max_concurrency == 0 {
            return Err(MdxaiError::configuration("max_concurrency must be positive"));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(MdxaiError::configuration(format!(
                    "temperature {t} outside 0.0..=2.0"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MdxaiConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            default_type: DEFAULT_TYPE.to_string(),
            functions_dir: PathBuf::from("functions"),
            temperature: None,
            max_tokens: None,
            step_timeout_secs: 120,
            max_concurrency: 4,
            api: ApiConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MdxaiConfig::new();
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.step_timeout(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_chain() {
        let config = MdxaiConfig::new()
            .with_model("local-llm")
            .with_functions_dir("/tmp/fns")
            .with_step_timeout(Duration::from_millis(10))
            .with_max_concurrency(2);
        assert_eq!(config.default_model, "local-llm");
        assert_eq!(config.functions_dir, PathBuf::from("/tmp/fns"));
        assert_eq!(config.step_timeout_secs, 1);
        assert_eq!(config.max_concurrency, 2);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = MdxaiConfig::from_toml_str(
            r#"
            default_model = "gpt-4o-mini"
            max_concurrency = 8

            [api]
            base_url = "http://localhost:8080/v1"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        assert_eq!(config.default_type, DEFAULT_TYPE);
    }

    #[test]
    fn malformed_toml_is_configuration_error() {
        let err = MdxaiConfig::from_toml_str("default_model = [").unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn env_overrides() {
        let config = MdxaiConfig::new().apply_env([
            ("MDXAI_MODEL", "env-model"),
            ("OPENAI_API_KEY", "sk-test"),
            ("MDXAI_CONCURRENCY", "not-a-number"),
            ("UNRELATED", "x"),
        ]);
        assert_eq!(config.default_model, "env-model");
        assert_eq!(config.api.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.max_concurrency, 4);
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(MdxaiConfig::new().with_model(" ").validate().is_err());
        assert!(MdxaiConfig::new().with_max_concurrency(0).validate().is_err());
        let mut config = MdxaiConfig::new();
        config.temperature = Some(3.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_is_not_serialized() {
        let config = MdxaiConfig::new().with_api_key("secret");
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("secret"));
    }
}
