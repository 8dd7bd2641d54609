//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and
//! every default reproduces the fixed constants the service was designed with.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the aggregation service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Outer request timeout.
    pub timeouts: TimeoutConfig,

    /// Per-upstream circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Per-client sliding window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Aggregate response cache.
    pub cache: CacheConfig,

    /// Liveness probe of the upstream base URLs.
    pub health: HealthConfig,

    /// The five upstream services.
    pub upstreams: UpstreamsConfig,

    /// Demo content used when assembling the aggregate.
    pub content: ContentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Circuit breaker configuration, shared by every upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// Time after the last failure before a probe is admitted, in milliseconds.
    pub reset_window_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn reset_window(&self) -> Duration {
        Duration::from_millis(self.reset_window_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_window_ms: 60_000,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client within one window.
    pub max_requests: usize,

    /// Length of the sliding window in milliseconds.
    pub window_ms: u64,

    /// Interval of the background sweep in milliseconds.
    pub sweep_interval_ms: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 30,
            window_ms: 60_000,
            sweep_interval_ms: 60_000,
        }
    }
}

/// Aggregate cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of an entry in milliseconds.
    pub ttl_ms: u64,

    /// Maximum number of entries before oldest-first eviction.
    pub max_items: usize,

    /// Interval of the background sweep in milliseconds.
    pub sweep_interval_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 300_000,
            max_items: 500,
            sweep_interval_ms: 60_000,
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Timeout of a single probe in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { timeout_ms: 3_000 }
    }
}

/// Settings for a single upstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL; request paths are appended to it.
    pub base_url: String,

    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_upstream_timeout_ms() -> u64 {
    3_000
}

fn default_max_attempts() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    1_000
}

impl UpstreamConfig {
    fn new(base_url: &str, timeout_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout_ms,
            max_attempts,
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// The five upstream services.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    pub countries: UpstreamConfig,
    pub weather: UpstreamConfig,
    pub trivia: UpstreamConfig,
    pub dictionary: UpstreamConfig,
    pub exchange: UpstreamConfig,
}

impl UpstreamsConfig {
    /// Iterate `(name, config)` pairs in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &UpstreamConfig)> {
        [
            ("countries", &self.countries),
            ("weather", &self.weather),
            ("trivia", &self.trivia),
            ("dictionary", &self.dictionary),
            ("exchange", &self.exchange),
        ]
        .into_iter()
    }
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            countries: UpstreamConfig::new("https://restcountries.com", 5_000, 3),
            weather: UpstreamConfig::new("https://api.open-meteo.com", 3_000, 2),
            trivia: UpstreamConfig::new("http://numbersapi.com", 3_000, 2),
            dictionary: UpstreamConfig::new("https://api.dictionaryapi.dev", 3_000, 2),
            exchange: UpstreamConfig::new("https://open.er-api.com", 3_000, 2),
        }
    }
}

/// Demo content: the word-of-the-day list and the placeholder image source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Candidate words, one picked uniformly at random per aggregation.
    pub words: Vec<String>,

    /// Base of the seeded placeholder image URL.
    pub image_base_url: String,

    pub image_width: u32,
    pub image_height: u32,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            words: ["serendipity", "eloquent", "ephemeral", "luminous", "zenith"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            image_base_url: "https://picsum.photos/seed".to_string(),
            image_width: 600,
            image_height: 400,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
