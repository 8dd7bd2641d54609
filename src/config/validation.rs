//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, windows and timeouts > 0)
//! - Check that upstream base URLs are usable http(s) URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every issue.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let positive = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("circuit_breaker.failure_threshold", config.circuit_breaker.failure_threshold as u64),
        ("circuit_breaker.reset_window_ms", config.circuit_breaker.reset_window_ms),
        ("rate_limit.max_requests", config.rate_limit.max_requests as u64),
        ("rate_limit.window_ms", config.rate_limit.window_ms),
        ("rate_limit.sweep_interval_ms", config.rate_limit.sweep_interval_ms),
        ("cache.ttl_ms", config.cache.ttl_ms),
        ("cache.max_items", config.cache.max_items as u64),
        ("cache.sweep_interval_ms", config.cache.sweep_interval_ms),
        ("health.timeout_ms", config.health.timeout_ms),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    for (name, upstream) in config.upstreams.iter() {
        match Url::parse(&upstream.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                format!("upstreams.{name}.base_url"),
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                format!("upstreams.{name}.base_url"),
                format!("invalid URL '{}': {}", upstream.base_url, e),
            )),
        }
        if upstream.timeout_ms == 0 {
            errors.push(ValidationError::new(
                format!("upstreams.{name}.timeout_ms"),
                "must be greater than zero",
            ));
        }
        if upstream.max_attempts == 0 {
            errors.push(ValidationError::new(
                format!("upstreams.{name}.max_attempts"),
                "at least one attempt is required",
            ));
        }
    }

    if config.content.words.iter().all(|w| w.trim().is_empty()) {
        errors.push(ValidationError::new("content.words", "word list is empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
