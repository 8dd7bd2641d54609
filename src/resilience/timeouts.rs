//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every upstream attempt with a deadline
//! - Turn an elapsed deadline into a distinct error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the timed-out future is dropped
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use crate::upstream::UpstreamError;

/// Run `fut`, failing with `UpstreamError::Timeout` once `limit` elapses.
pub async fn with_timeout<T, Fut>(
    service: &str,
    limit: Duration,
    fut: Fut,
) -> Result<T, UpstreamError>
where
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout {
            service: service.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
