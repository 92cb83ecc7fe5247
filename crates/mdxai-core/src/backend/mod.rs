//! Language-model backend seam
//!
//! The engine talks to models only through [`Backend`]. Implementations are
//! injected as `Arc<dyn Backend>` so tests can substitute a scripted mock.

pub mod openai;

pub use openai::OpenAiBackend;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use mdxai_schema::CompiledSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stream of text chunks from a backend
pub type TextStream = BoxStream<'static, Result<String>>;

/// Free-text generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    /// User prompt
    pub prompt: String,
    /// System prompt
    pub system: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Token limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl TextRequest {
    /// Create request with no sampling overrides
    #[must_use]
    pub fn new(prompt: impl Into<String>, system: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: system.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// With sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// With token limit
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Why the backend stopped producing text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of output
    Stop,
    /// Token limit reached
    Length,
    /// Output withheld by a content filter
    ContentFilter,
    /// Reason not reported
    #[default]
    Unknown,
}

impl FinishReason {
    /// Map a wire-level finish reason
    #[must_use]
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => Self::Stop,
            Some("length") => Self::Length,
            Some("content_filter") => Self::ContentFilter,
            _ => Self::Unknown,
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// Free-text generation response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextResponse {
    /// Generated text
    pub text: String,
    /// Stop reason
    pub finish_reason: FinishReason,
    /// Token usage, when reported
    pub usage: Option<Usage>,
}

impl TextResponse {
    /// Response carrying only text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }
}

/// Structured generation request
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    /// User prompt
    pub prompt: String,
    /// System prompt
    pub system: String,
    /// Model identifier
    pub model: String,
    /// Compiled output schema; its shape tells the backend what to emit
    pub schema: CompiledSchema,
}

/// Language-model backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Generate free text
    async fn generate_text(&self, request: &TextRequest) -> Result<TextResponse>;

    /// Generate free text as a stream of chunks
    ///
    /// Defaults to a single chunk produced by [`Backend::generate_text`].
    async fn stream_text(&self, request: &TextRequest) -> Result<TextStream> {
        let response = self.generate_text(request).await?;
        Ok(stream::once(async move { Ok(response.text) }).boxed())
    }

    /// Generate a value conforming to the request schema's shape
    ///
    /// Object shape yields a JSON object, array shape a JSON array, freeform a
    /// JSON string.
    async fn generate_structured(&self, request: &StructuredRequest) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Backend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate_text(&self, request: &TextRequest) -> Result<TextResponse> {
            Ok(TextResponse::text(request.prompt.clone()))
        }

        async fn generate_structured(&self, request: &StructuredRequest) -> Result<Value> {
            Ok(Value::String(request.prompt.clone()))
        }
    }

    #[tokio::test]
    async fn default_stream_yields_single_chunk() {
        let request = TextRequest::new("hello", "sys", "m");
        let chunks: Vec<String> = Echo
            .stream_text(&request)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["hello".to_string()]);
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(FinishReason::from_wire(Some("stop")), FinishReason::Stop);
        assert_eq!(FinishReason::from_wire(Some("length")), FinishReason::Length);
        assert_eq!(FinishReason::from_wire(None), FinishReason::Unknown);
    }
}
