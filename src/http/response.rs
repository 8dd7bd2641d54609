//! Error responses.
//!
//! Maps the aggregation error taxonomy to HTTP status codes and structured
//! JSON bodies. Every failure yields a JSON object with at least `error`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::aggregate::AggregateError;
use crate::upstream::UpstreamError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct UpstreamErrorBody {
    error: &'static str,
    message: String,
    status: u16,
    code: &'static str,
    service: String,
}

impl AggregateError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AggregateError::Validation(_) => StatusCode::BAD_REQUEST,
            AggregateError::NotFound(_) => StatusCode::NOT_FOUND,
            AggregateError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AggregateError::TimedOut => StatusCode::REQUEST_TIMEOUT,
            AggregateError::Upstream(UpstreamError::Decode { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AggregateError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short machine-readable label, also used as the metrics outcome.
    pub fn code(&self) -> &'static str {
        match self {
            AggregateError::Validation(_) => "VALIDATION_ERROR",
            AggregateError::NotFound(_) => "NOT_FOUND",
            AggregateError::RateLimited => "RATE_LIMITED",
            AggregateError::TimedOut => "REQUEST_TIMEOUT",
            AggregateError::Upstream(UpstreamError::CircuitOpen(_)) => "CIRCUIT_OPEN",
            AggregateError::Upstream(UpstreamError::Timeout { .. }) => "UPSTREAM_TIMEOUT",
            AggregateError::Upstream(UpstreamError::Decode { .. }) => "UPSTREAM_BAD_RESPONSE",
            AggregateError::Upstream(_) => "UPSTREAM_UNAVAILABLE",
        }
    }
}

impl IntoResponse for AggregateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AggregateError::Upstream(e) => {
                let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    "Upstream service returned an invalid response"
                } else {
                    "Upstream service unavailable"
                };
                let body = UpstreamErrorBody {
                    error,
                    message: e.to_string(),
                    status: status.as_u16(),
                    code: self.code(),
                    service: e.service().to_string(),
                };
                (status, Json(body)).into_response()
            }
            _ => (status, Json(ErrorBody { error: self.to_string() })).into_response(),
        }
    }
}
