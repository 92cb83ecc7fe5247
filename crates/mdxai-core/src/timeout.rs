//! Deadlines for network-bound steps

use crate::backend::TextStream;
use crate::error::{MdxaiError, Result};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

fn millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}

/// Run `step` under `limit`
///
/// # Errors
/// Returns the step's own error, or [`MdxaiError::Timeout`] without partial
/// output when the deadline passes first.
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, step: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, step).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = millis(limit), "step timed out");
            Err(MdxaiError::Timeout {
                operation: operation.to_string(),
                timeout_ms: millis(limit),
                partial: None,
            })
        }
    }
}

/// Drain a text stream into a string under one overall deadline
///
/// `on_chunk` sees every chunk as it arrives.
///
/// # Errors
/// A chunk error is returned as-is. When the deadline passes, the text
/// accumulated so far is carried in [`MdxaiError::Timeout::partial`].
pub async fn collect_stream<F>(
    operation: &str,
    limit: Duration,
    mut stream: TextStream,
    mut on_chunk: F,
) -> Result<String>
where
    F: FnMut(&str),
{
    let deadline = Instant::now() + limit;
    let mut accumulated = String::new();
    loop {
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(Some(Ok(chunk))) => {
                on_chunk(&chunk);
                accumulated.push_str(&chunk);
            }
            Ok(Some(Err(err))) => return Err(err),
            Ok(None) => return Ok(accumulated),
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = millis(limit),
                    partial_len = accumulated.len(),
                    "stream timed out"
                );
                return Err(MdxaiError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: millis(limit),
                    partial: Some(accumulated),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn step_within_limit() {
        let value = with_timeout("quick", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn step_past_limit() {
        let err = with_timeout("slow", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, MdxaiError::Timeout { ref operation, timeout_ms: 50, partial: None } if operation == "slow"));
    }

    #[tokio::test]
    async fn stream_collects_all_chunks() {
        let chunks = stream::iter(vec![Ok("a".to_string()), Ok("b".to_string())]).boxed();
        let mut seen = 0;
        let text = collect_stream("s", Duration::from_secs(1), chunks, |_| seen += 1)
            .await
            .unwrap();
        assert_eq!(text, "ab");
        assert_eq!(seen, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_timeout_keeps_partial() {
        let chunks = stream::iter(vec![Ok("# Title\n".to_string())])
            .chain(stream::once(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("never".to_string())
            }))
            .boxed();
        let err = collect_stream("generate", Duration::from_millis(100), chunks, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.partial_output(), Some("# Title\n"));
    }
}
