//! Upstream call errors.

use thiserror::Error;

use crate::resilience::circuit_breaker::CircuitOpenError;

/// Errors that can occur while calling an upstream service.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The breaker for the service rejected the call.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// A single attempt exceeded its deadline.
    #[error("{service} timed out after {timeout_ms}ms")]
    Timeout { service: String, timeout_ms: u64 },

    /// The service answered with a non-success status.
    #[error("{service} returned HTTP {status}")]
    Status { service: String, status: u16 },

    /// Connection or protocol level failure.
    #[error("{service} request failed: {message}")]
    Transport { service: String, message: String },

    /// The payload could not be decoded.
    #[error("{service} returned an unreadable payload: {message}")]
    Decode { service: String, message: String },
}

impl UpstreamError {
    /// Name of the upstream the error originated from.
    pub fn service(&self) -> &str {
        match self {
            UpstreamError::CircuitOpen(e) => &e.service,
            UpstreamError::Timeout { service, .. }
            | UpstreamError::Status { service, .. }
            | UpstreamError::Transport { service, .. }
            | UpstreamError::Decode { service, .. } => service,
        }
    }

    /// Map a reqwest failure for `service`.
    pub fn from_reqwest(service: &str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            UpstreamError::Status {
                service: service.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            UpstreamError::Decode {
                service: service.to_string(),
                message: err.to_string(),
            }
        } else {
            UpstreamError::Transport {
                service: service.to_string(),
                message: err.to_string(),
            }
        }
    }
}
