//! Endpoint handlers for `/api/super-info`.

use axum::{
    extract::{rejection::QueryRejection, ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    BoxError, Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Instant;
use tower::timeout::error::Elapsed;

use crate::aggregate::AggregateError;
use crate::health::HealthReport;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Query string accepted by the endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SuperInfoQuery {
    pub country: Option<String>,
    pub health: Option<String>,
}

impl SuperInfoQuery {
    fn is_health_check(&self) -> bool {
        self.health.as_deref() == Some("check")
    }
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    #[serde(flatten)]
    report: HealthReport,
}

/// `GET /api/super-info`: health check or aggregate lookup.
pub async fn super_info(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<SuperInfoQuery>, QueryRejection>,
) -> Response {
    let start = Instant::now();
    let client = addr.ip().to_string();
    let request_id = request_id(&headers);

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            let e = AggregateError::Validation(rejection.body_text());
            return reject(e, start, request_id, &client);
        }
    };

    if query.is_health_check() {
        return health_check(&state).await;
    }

    match state.aggregator.handle(query.country.as_deref(), &client).await {
        Ok(result) => {
            metrics::record_request("success", start);
            tracing::debug!(
                request_id = %request_id,
                client = %client,
                country = %result.country,
                "Aggregate served"
            );
            (StatusCode::OK, Json(result.as_ref())).into_response()
        }
        Err(e) => reject(e, start, request_id, &client),
    }
}

fn reject(e: AggregateError, start: Instant, request_id: &str, client: &str) -> Response {
    let status = e.status_code();
    metrics::record_request(e.code(), start);
    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            client = %client,
            status = %status,
            error = %e,
            "Aggregation failed"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            client = %client,
            status = %status,
            error = %e,
            "Request rejected"
        );
    }
    e.into_response()
}

/// Converts errors raised by the middleware stack into JSON responses.
pub async fn handle_middleware_error(err: BoxError) -> Response {
    if err.is::<Elapsed>() {
        tracing::warn!("Request exceeded the server deadline");
        AggregateError::TimedOut.into_response()
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        let body = serde_json::json!({ "error": "Internal server error" });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

async fn health_check(state: &AppState) -> Response {
    let report = state.health.check().await;
    if !report.all_up() {
        tracing::warn!(errors = ?report.errors, "Health check found unreachable upstreams");
    }
    let body = HealthBody { status: "ok", report };
    (StatusCode::OK, Json(body)).into_response()
}

/// `OPTIONS /api/super-info`: CORS preflight, empty body.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ProbeStatus;

    #[test]
    fn test_health_flag() {
        let query = SuperInfoQuery {
            health: Some("check".into()),
            ..Default::default()
        };
        assert!(query.is_health_check());

        let query = SuperInfoQuery {
            health: Some("yes".into()),
            country: Some("france".into()),
        };
        assert!(!query.is_health_check());
    }

    #[tokio::test]
    async fn test_deadline_error_is_json() {
        let response = handle_middleware_error(Box::new(Elapsed::new())).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Request timed out");
    }

    #[tokio::test]
    async fn test_other_middleware_error_is_json() {
        let response = handle_middleware_error("broken pipe".into()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn test_health_body_shape() {
        let mut report = HealthReport::default();
        report.services.insert("countries".into(), ProbeStatus::Up);
        report.services.insert("weather".into(), ProbeStatus::Down);
        report.errors.insert("weather".into(), "HTTP 502".into());

        let json = serde_json::to_value(HealthBody { status: "ok", report }).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["services"]["countries"], "up");
        assert_eq!(json["services"]["weather"], "down");
        assert_eq!(json["errors"]["weather"], "HTTP 502");
    }

    #[test]
    fn test_health_body_omits_empty_errors() {
        let json = serde_json::to_value(HealthBody {
            status: "ok",
            report: HealthReport::default(),
        })
        .unwrap();
        assert!(json.get("errors").is_none());
    }
}
