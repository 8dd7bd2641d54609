//! Upstream liveness probe.
//!
//! # Responsibilities
//! - GET every configured upstream base URL in parallel
//! - Report each as up or down, with the error text for down ones
//!
//! # Design Decisions
//! - Bypasses breakers, cache and rate limiter; never changes breaker state
//! - Any HTTP answer below 500 counts as up (base URLs rarely serve 2xx)
//! - Never fails as a whole; each probe is bounded by a short timeout

use futures_util::future::join_all;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{HealthConfig, UpstreamsConfig};

/// Liveness of one upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

/// Outcome of probing one upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: ProbeStatus,
    pub error: Option<String>,
}

/// Outcome of probing every upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub services: BTreeMap<String, ProbeStatus>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl HealthReport {
    pub fn all_up(&self) -> bool {
        self.services.values().all(|s| *s == ProbeStatus::Up)
    }
}

/// Probes the upstream base URLs.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
    targets: Vec<(String, String)>,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(upstreams: &UpstreamsConfig, config: &HealthConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("super-info-health-check")
            .build()?;
        let targets = upstreams
            .iter()
            .map(|(name, upstream)| (name.to_string(), upstream.base_url.clone()))
            .collect();

        Ok(Self {
            client,
            targets,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    /// Probe every upstream once.
    pub async fn check(&self) -> HealthReport {
        let probes = self.targets.iter().map(|(name, url)| async move {
            (name.clone(), self.probe(name, url).await)
        });

        let mut report = HealthReport::default();
        for (name, result) in join_all(probes).await {
            if let Some(error) = result.error {
                report.errors.insert(name.clone(), error);
            }
            report.services.insert(name, result.status);
        }
        report
    }

    async fn probe(&self, name: &str, url: &str) -> ProbeResult {
        let outcome = self.client.get(url).timeout(self.timeout).send().await;

        match outcome {
            Ok(response) if !response.status().is_server_error() => ProbeResult {
                status: ProbeStatus::Up,
                error: None,
            },
            Ok(response) => {
                tracing::warn!(
                    service = %name,
                    status = %response.status(),
                    "Health probe failed: server error"
                );
                ProbeResult {
                    status: ProbeStatus::Down,
                    error: Some(format!("HTTP {}", response.status().as_u16())),
                }
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timeout after {}ms", self.timeout.as_millis())
                } else {
                    e.to_string()
                };
                tracing::warn!(service = %name, error = %reason, "Health probe failed");
                ProbeResult {
                    status: ProbeStatus::Down,
                    error: Some(reason),
                }
            }
        }
    }
}
