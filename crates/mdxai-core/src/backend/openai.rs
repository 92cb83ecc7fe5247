//! OpenAI-compatible chat-completions backend

use super::{Backend, FinishReason, StructuredRequest, TextRequest, TextResponse, TextStream, Usage};
use crate::config::{ApiConfig, DEFAULT_BASE_URL};
use crate::error::{MdxaiError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mdxai_schema::OutputShape;
use reqwest::Client;
use serde_json::{json, Value};

/// Wrapper property for array-shaped structured output
const ITEMS_KEY: &str = "items";

/// Backend for any server speaking the chat-completions protocol
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiBackend {
    /// Build from connection settings
    ///
    /// # Errors
    /// Returns a configuration error when the hosted endpoint is selected
    /// without an API key, or the HTTP client cannot be built.
    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        let base = api.base_url.trim_end_matches('/');
        if api.api_key.is_none() && base == DEFAULT_BASE_URL {
            return Err(MdxaiError::configuration(
                "no API key configured (set OPENAI_API_KEY or api.api_key)",
            ));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| MdxaiError::configuration(format!("http client: {e}")))?;
        Ok(Self {
            endpoint: format!("{base}/chat/completions"),
            api_key: api.api_key.clone(),
            client,
        })
    }

    /// Request URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| MdxaiError::generation(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MdxaiError::generation(format!(
                "backend returned {status}: {text}"
            )));
        }
        Ok(response)
    }

    async fn complete(&self, body: Value) -> Result<TextResponse> {
        let response: Value = self
            .post(&body)
            .await?
            .json()
            .await
            .map_err(|e| MdxaiError::generation(format!("unreadable response: {e}")))?;
        parse_completion(&response)
    }
}

/// Chat-completions request body
fn chat_body(request: &TextRequest, stream: bool) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": [
            {"role": "system", "content": request.system},
            {"role": "user", "content": request.prompt}
        ],
        "stream": stream,
    });
    if let Some(t) = request.temperature {
        body["temperature"] = json!(t);
    }
    if let Some(n) = request.max_tokens {
        body["max_tokens"] = json!(n);
    }
    body
}

/// Extract text, finish reason and usage from a completion
fn parse_completion(response: &Value) -> Result<TextResponse> {
    let choice = &response["choices"][0];
    let text = choice["message"]["content"]
        .as_str()
        .ok_or_else(|| MdxaiError::generation("response has no message content"))?;
    let usage = response.get("usage").and_then(|u| {
        Some(Usage {
            prompt_tokens: u32::try_from(u.get("prompt_tokens")?.as_u64()?).ok()?,
            completion_tokens: u32::try_from(u.get("completion_tokens")?.as_u64()?).ok()?,
            total_tokens: u32::try_from(u.get("total_tokens")?.as_u64()?).ok()?,
        })
    });
    Ok(TextResponse {
        text: text.to_string(),
        finish_reason: FinishReason::from_wire(choice["finish_reason"].as_str()),
        usage,
    })
}

/// Pull complete `data:` lines out of an SSE buffer
fn drain_events(buffer: &mut Vec<u8>) -> Vec<Result<String>> {
    let mut out = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line);
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            continue;
        }
        match serde_json::from_str::<Value>(data) {
            Ok(event) => {
                if let Some(delta) = event["choices"][0]["delta"]["content"].as_str() {
                    if !delta.is_empty() {
                        out.push(Ok(delta.to_string()));
                    }
                }
            }
            Err(e) => out.push(Err(MdxaiError::parsing(format!("bad stream event: {e}")))),
        }
    }
    out
}

/// Map shape to a `response_format` and whether output is wrapped in `items`
fn response_format(request: &StructuredRequest) -> Option<(Value, bool)> {
    let schema = request.schema.json_schema()?;
    let (schema, wrapped) = match request.schema.shape() {
        OutputShape::Array => (
            json!({
                "type": "object",
                "properties": { (ITEMS_KEY): schema },
                "required": [ITEMS_KEY],
                "additionalProperties": false,
            }),
            true,
        ),
        _ => (schema, false),
    };
    let format = json!({
        "type": "json_schema",
        "json_schema": { "name": "output", "schema": schema },
    });
    Some((format, wrapped))
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<TextResponse> {
        tracing::debug!(model = %request.model, "chat completion");
        self.complete(chat_body(request, false)).await
    }

    async fn stream_text(&self, request: &TextRequest) -> Result<TextStream> {
        tracing::debug!(model = %request.model, "streaming chat completion");
        let response = self.post(&chat_body(request, true)).await?;
        let events = response
            .bytes_stream()
            .scan(Vec::new(), |buffer, chunk| {
                let out = match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        drain_events(buffer)
                    }
                    Err(e) => vec![Err(MdxaiError::generation(format!("stream failed: {e}")))],
                };
                futures::future::ready(Some(stream::iter(out)))
            })
            .flatten()
            .boxed();
        Ok(events)
    }

    async fn generate_structured(&self, request: &StructuredRequest) -> Result<Value> {
        let text_request = TextRequest::new(&request.prompt, &request.system, &request.model);
        let Some((format, wrapped)) = response_format(request) else {
            let response = self.generate_text(&text_request).await?;
            return Ok(Value::String(response.text));
        };

        let mut body = chat_body(&text_request, false);
        body["response_format"] = format;
        let response = self.complete(body).await?;
        let mut value: Value = serde_json::from_str(&response.text)?;
        if wrapped {
            value = value
                .get_mut(ITEMS_KEY)
                .map(Value::take)
                .ok_or_else(|| MdxaiError::generation("array output missing items wrapper"))?;
        }
        Ok(value)
    }
}
