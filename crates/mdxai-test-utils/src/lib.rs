//! Testing utilities for mdxai workspace
//!
//! Scripted backend, fixtures and config helpers.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mdxai_core::backend::{Backend, StructuredRequest, TextRequest, TextResponse, TextStream};
use mdxai_core::{MdxaiConfig, MdxaiError, Result};
use mdxai_schema::OutputShape;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Document returned when no text reply is scripted
pub const ARTICLE_MDX: &str = "\
---
title: Testing
description: A short article about testing.
---

# Testing

Tests keep code honest.
";

/// Outline reply with two sections
pub const OUTLINE_JSON: &str = r#"[
  {"title": "Why test", "description": "Motivation"},
  {"title": "How to test", "description": "Techniques"}
]"#;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
}

/// Scripted [`Backend`] recording every request
#[derive(Debug, Default)]
pub struct MockBackend {
    text_replies: Mutex<VecDeque<Reply>>,
    structured_replies: Mutex<VecDeque<Value>>,
    text_requests: Mutex<Vec<TextRequest>>,
    structured_requests: Mutex<Vec<StructuredRequest>>,
    text_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    structured_calls: AtomicUsize,
    delay: Option<Duration>,
    chunk_delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.text_replies.lock().push_back(Reply::Text(text.into()));
        self
    }

    /// Queue a failing text call
    #[must_use]
    pub fn with_text_error(self, message: impl Into<String>) -> Self {
        self.text_replies.lock().push_back(Reply::Fail(message.into()));
        self
    }

    /// Queue a structured reply
    #[must_use]
    pub fn with_structured(self, value: Value) -> Self {
        self.structured_replies.lock().push_back(value);
        self
    }

    /// Delay every call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stream one line per chunk, sleeping between chunks
    #[must_use]
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn structured_calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    pub fn text_requests(&self) -> Vec<TextRequest> {
        self.text_requests.lock().clone()
    }

    pub fn structured_requests(&self) -> Vec<StructuredRequest> {
        self.structured_requests.lock().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn next_text(&self) -> Result<String> {
        match self.text_replies.lock().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(MdxaiError::generation(message)),
            None => Ok(ARTICLE_MDX.to_string()),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<TextResponse> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text_requests.lock().push(request.clone());
        self.pause().await;
        self.next_text().map(TextResponse::text)
    }

    async fn stream_text(&self, request: &TextRequest) -> Result<TextStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.text_requests.lock().push(request.clone());
        self.pause().await;
        let text = self.next_text()?;
        let chunks: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        let chunk_delay = self.chunk_delay;
        let stream = stream::iter(chunks)
            .then(move |chunk| async move {
                if let Some(delay) = chunk_delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            })
            .boxed();
        Ok(stream)
    }

    async fn generate_structured(&self, request: &StructuredRequest) -> Result<Value> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.structured_requests.lock().push(request.clone());
        self.pause().await;
        if let Some(value) = self.structured_replies.lock().pop_front() {
            return Ok(value);
        }
        Ok(match request.schema.shape() {
            OutputShape::Array => serde_json::json!([]),
            OutputShape::Object => serde_json::json!({ "content": "generated" }),
            OutputShape::Freeform => Value::String("generated".into()),
        })
    }
}

/// Config pointing the registry at `dir`, with a short step timeout
pub fn test_config(dir: &Path) -> MdxaiConfig {
    MdxaiConfig::new()
        .with_model("test-model")
        .with_functions_dir(dir)
        .with_step_timeout(Duration::from_secs(5))
        .with_max_concurrency(2)
}

/// Write a specification file into `dir`
pub fn write_spec(dir: &Path, name: &str, text: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(format!("{name}.md")), text).unwrap();
}

/// Fresh temporary functions directory
pub fn functions_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}
