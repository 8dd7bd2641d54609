//! Retry logic.
//!
//! # Responsibilities
//! - Bound each attempt with the upstream's timeout
//! - Retry failed attempts with exponential backoff
//! - Run the whole attempt loop inside the upstream's circuit breaker
//!
//! # Design Decisions
//! - Only GETs are issued upstream, so every failure is retryable
//! - The final attempt's error propagates unmodified
//! - An exhausted loop counts as one breaker failure, not one per attempt
//! - A breaker rejection makes no attempt at all

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::circuit_breaker::CircuitBreakerRegistry;
use crate::resilience::timeouts::with_timeout;
use crate::upstream::UpstreamError;

/// Retry parameters for one upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further one.
    pub base_delay: Duration,
    /// Deadline of a single attempt.
    pub timeout: Duration,
}

impl From<&UpstreamConfig> for RetryPolicy {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Upstream caller with bounded retries behind a named circuit breaker.
#[derive(Debug, Clone)]
pub struct RetryingClient {
    breakers: Arc<CircuitBreakerRegistry>,
}

impl RetryingClient {
    pub fn new(breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self { breakers }
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    /// Call `attempt` until it succeeds or `policy.max_attempts` is exhausted.
    pub async fn fetch<T, F, Fut>(
        &self,
        name: &str,
        policy: &RetryPolicy,
        mut attempt: F,
    ) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let policy = *policy;
        let result = self
            .breakers
            .execute(name, move || async move {
                let attempts = policy.max_attempts.max(1);
                let mut index = 0;
                loop {
                    match with_timeout(name, policy.timeout, attempt()).await {
                        Ok(value) => return Ok(value),
                        Err(e) if index + 1 < attempts => {
                            let delay = calculate_backoff(index, policy.base_delay);
                            tracing::warn!(
                                service = %name,
                                attempt = index + 1,
                                max_attempts = attempts,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "Upstream attempt failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            index += 1;
                        }
                        Err(e) => {
                            tracing::error!(
                                service = %name,
                                attempts = attempts,
                                error = %e,
                                "Upstream attempts exhausted"
                            );
                            return Err(e);
                        }
                    }
                }
            })
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(UpstreamError::CircuitOpen(_)) => "rejected",
            Err(_) => "failure",
        };
        metrics::record_upstream_call(name, outcome);
        result
    }
}
