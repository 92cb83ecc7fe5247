//! Outline-then-expand document generator
//!
//! ```text
//! Start ──(recursive && depth > 0)──▶ Outline ──▶ ExpandOutline ──┐
//!   │                                                             ▼
//!   └──────────────────────────────▶ DirectGenerate ──────────▶ Done
//! ```
//!
//! The outline stage makes exactly one text call. Expansion folds every
//! outline item into one composite topic and runs a single direct generation
//! with `recursive` cleared, so recursion never goes more than one level deep.

use crate::backend::{Backend, TextRequest};
use crate::config::MdxaiConfig;
use crate::error::{MdxaiError, Result};
use crate::outline::{parse_outline, strip_fence};
use crate::prompts;
use crate::timeout::{collect_stream, with_timeout};
use crate::types::{GenerationRequest, GenerationResult, OutlineItem};
use mdxai_document::{stringify, synthesize, Document, StringifyOptions};
use std::sync::Arc;

/// Request resolved against configuration defaults
#[derive(Debug, Clone)]
struct Resolved {
    request: GenerationRequest,
    type_name: String,
    model: String,
}

/// Document generator
#[derive(Clone)]
pub struct Generator {
    backend: Arc<dyn Backend>,
    config: MdxaiConfig,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Generator {
    /// Create generator over a backend
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: MdxaiConfig) -> Self {
        Self { backend, config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MdxaiConfig {
        &self.config
    }

    /// Generate one document
    ///
    /// # Errors
    /// - `Configuration` when no model can be resolved
    /// - `Generation` when the backend fails or returns an empty outline
    /// - `Parsing` when the outline is not valid JSON (no expansion is attempted)
    /// - `Timeout` when a backend step exceeds the configured limit
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let resolved = self.resolve(request)?;
        let (direct, outline) = self.plan(resolved).await?;

        tracing::info!(type_name = %direct.type_name, model = %direct.model, "direct generation");
        let text_request = self.text_request(&direct);
        let response = with_timeout(
            "generate",
            self.config.step_timeout(),
            self.backend.generate_text(&text_request),
        )
        .await?;
        self.finish(&direct, &response.text, outline)
    }

    /// Generate one document, streaming text chunks to `on_chunk`
    ///
    /// The outline stage, when requested, is not streamed.
    ///
    /// # Errors
    /// As [`Generator::generate`]. A timeout while streaming carries the text
    /// received so far.
    pub async fn generate_streaming<F>(
        &self,
        request: &GenerationRequest,
        on_chunk: F,
    ) -> Result<GenerationResult>
    where
        F: FnMut(&str),
    {
        let resolved = self.resolve(request)?;
        let (direct, outline) = self.plan(resolved).await?;

        tracing::info!(type_name = %direct.type_name, model = %direct.model, "streaming generation");
        let text_request = self.text_request(&direct);
        let limit = self.config.step_timeout();
        let stream = with_timeout("stream", limit, self.backend.stream_text(&text_request)).await?;
        let text = collect_stream("stream", limit, stream, on_chunk).await?;
        self.finish(&direct, &text, outline)
    }

    fn resolve(&self, request: &GenerationRequest) -> Result<Resolved> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());
        if model.trim().is_empty() {
            return Err(MdxaiError::configuration("no model configured"));
        }
        let type_name = request
            .type_name
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.config.default_type.clone());
        Ok(Resolved {
            request: request.clone(),
            type_name,
            model,
        })
    }

    /// Run the outline stage when requested and return the direct step to run
    async fn plan(&self, resolved: Resolved) -> Result<(Resolved, Option<Vec<OutlineItem>>)> {
        if !resolved.request.wants_outline() {
            return Ok((resolved, None));
        }

        let outline = self.outline(&resolved).await?;
        tracing::info!(items = outline.len(), "expanding outline");
        let expanded = GenerationRequest {
            prompt: prompts::expansion_prompt(&resolved.request.prompt, &outline),
            recursive: false,
            ..resolved.request.clone()
        };
        Ok((
            Resolved {
                request: expanded,
                ..resolved
            },
            Some(outline),
        ))
    }

    async fn outline(&self, resolved: &Resolved) -> Result<Vec<OutlineItem>> {
        tracing::info!(
            type_name = %resolved.type_name,
            depth = resolved.request.depth,
            "generating outline"
        );
        let request = TextRequest::new(
            prompts::outline_prompt(&resolved.type_name, &resolved.request.prompt, resolved.request.depth),
            prompts::outline_system_prompt(),
            &resolved.model,
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let response = with_timeout(
            "outline",
            self.config.step_timeout(),
            self.backend.generate_text(&request),
        )
        .await?;
        parse_outline(&response.text).map_err(|err| {
            tracing::warn!(error = %err, "outline rejected");
            err
        })
    }

    fn text_request(&self, resolved: &Resolved) -> TextRequest {
        TextRequest::new(
            prompts::document_prompt(&resolved.type_name, &resolved.request.prompt),
            prompts::document_system_prompt(&resolved.request.components),
            &resolved.model,
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
    }

    fn finish(
        &self,
        resolved: &Resolved,
        text: &str,
        outline: Option<Vec<OutlineItem>>,
    ) -> Result<GenerationResult> {
        let source = strip_fence(text);
        if source.is_empty() {
            return Err(MdxaiError::generation("model returned an empty document"));
        }
        let document = synthesize(Document::new(), &resolved.type_name, &resolved.model, source);
        let content = stringify(&document, &StringifyOptions::default())?;
        tracing::debug!(bytes = content.len(), "document synthesized");
        Ok(GenerationResult {
            content,
            document,
            outline,
        })
    }
}
