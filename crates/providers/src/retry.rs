//! Transport-level retries with per-attempt timeouts.
//!
//! Wraps a chat or speech provider: each attempt is bounded by a timeout,
//! and transient failures (network, timeout, overload, 5xx) are retried a
//! small number of times with a linear backoff. Rate limiting and client
//! errors are returned immediately.

use async_trait::async_trait;
use prepwire_core::error::ProviderError;
use prepwire_core::provider::{CompletionRequest, CompletionResponse, Provider};
use prepwire_core::speech::{SpeechProvider, Voice};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Attempt budget for one upstream call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Bound on each individual attempt.
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Run `op` under this policy.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        info!(upstream = label, attempt, "Retry: upstream recovered");
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "'{label}' timed out after {}s",
                    self.timeout.as_secs()
                )),
            };

            if !error.is_transient() || attempt >= attempts {
                return Err(error);
            }

            warn!(
                upstream = label,
                attempt,
                total = attempts,
                error = %error,
                "Retry: transient upstream failure, retrying"
            );
            tokio::time::sleep(self.backoff * attempt).await;
        }
    }
}

/// A chat provider that retries transient failures of its inner provider.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        self.policy
            .run(self.inner.name(), || self.inner.complete(request.clone()))
            .await
    }
}

/// A speech provider that retries transient failures of its inner provider.
pub struct RetryingSpeechProvider {
    inner: Arc<dyn SpeechProvider>,
    policy: RetryPolicy,
}

impl RetryingSpeechProvider {
    pub fn new(inner: Arc<dyn SpeechProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl SpeechProvider for RetryingSpeechProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>, ProviderError> {
        self.policy
            .run(self.inner.name(), || self.inner.synthesize(text, voice))
            .await
    }
}
