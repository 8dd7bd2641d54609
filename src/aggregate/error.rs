//! Aggregation error taxonomy.

use thiserror::Error;

use crate::upstream::UpstreamError;

/// Errors that end an aggregation request.
#[derive(Debug, Clone, Error)]
pub enum AggregateError {
    /// Malformed or absent input.
    #[error("{0}")]
    Validation(String),

    /// The client exceeded its request budget.
    #[error("Too many requests, please try again later")]
    RateLimited,

    /// No country record matched the query.
    #[error("No country found matching '{0}'")]
    NotFound(String),

    /// The whole request outlived the server-side deadline.
    #[error("Request timed out")]
    TimedOut,

    /// An upstream call failed after retries, or its breaker is open.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            AggregateError::NotFound("atlantis".into()).to_string(),
            "No country found matching 'atlantis'"
        );

        let err: AggregateError = UpstreamError::Status {
            service: "weather".into(),
            status: 500,
        }
        .into();
        assert_eq!(err.to_string(), "weather returned HTTP 500");
    }
}
