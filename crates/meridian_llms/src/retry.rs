//! Initial-connection retry with exponential backoff.
//!
//! Retries apply only until a stream has produced its first event. Once any
//! event has been yielded, failures propagate to the caller unchanged.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::warn;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::types::{GenerateRequest, GenerateStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// No retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent.
pub async fn connect_with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "provider connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Open a provider stream and wait for its first event, retrying connection
/// failures that happen before that event.
///
/// The returned stream replays the first event before the rest.
pub async fn open_stream(
    provider: Arc<dyn Provider>,
    request: GenerateRequest,
    policy: RetryPolicy,
) -> Result<GenerateStream> {
    connect_with_retry(policy, || {
        let provider = Arc::clone(&provider);
        let request = request.clone();
        async move {
            let mut stream = provider.stream(request).await?;
            match stream.next().await {
                Some(Ok(first)) => {
                    let rest = futures::stream::once(async move { Ok(first) }).chain(stream);
                    Ok(GenerateStream::new(Box::pin(rest)))
                }
                Some(Err(e)) => Err(e),
                None => Err(Error::stream_error("stream ended before any event")),
            }
        }
    })
    .await
}
