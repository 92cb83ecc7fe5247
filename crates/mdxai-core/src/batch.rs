//! Concurrent batch generation

use crate::error::{MdxaiError, Result};
use crate::generator::Generator;
use crate::types::{GenerationRequest, GenerationResult};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

impl Generator {
    /// Generate several documents, at most `max_concurrency` at a time
    ///
    /// Results are returned in input order; one failure does not affect the
    /// other requests.
    pub async fn generate_batch(&self, requests: &[GenerationRequest]) -> Vec<Result<GenerationResult>> {
        let permits = Arc::new(Semaphore::new(self.config().max_concurrency.max(1)));
        tracing::info!(
            count = requests.len(),
            max_concurrency = self.config().max_concurrency,
            "batch generation"
        );

        let tasks = requests.iter().enumerate().map(|(index, request)| {
            let permits = Arc::clone(&permits);
            async move {
                let _permit = permits
                    .acquire()
                    .await
                    .map_err(|_| MdxaiError::generation("batch admission closed"))?;
                let result = self.generate(request).await;
                if let Err(err) = &result {
                    tracing::warn!(index, error = %err, "batch item failed");
                }
                result
            }
        });
        join_all(tasks).await
    }
}
