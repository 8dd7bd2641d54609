//! Upstream services subsystem.
//!
//! # Data Flow
//! ```text
//! Aggregator
//!     → client.rs (build request for one service)
//!     → resilience::RetryingClient (breaker + retries + timeout)
//!     → reqwest
//!     → types.rs (decode the minimal fields consumed)
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientInitError, UpstreamApi};
pub use error::UpstreamError;

/// Breaker name of the country lookup service.
pub const COUNTRIES: &str = "countries";
/// Breaker name of the weather service.
pub const WEATHER: &str = "weather";
/// Breaker name of the trivia service.
pub const TRIVIA: &str = "trivia";
/// Breaker name of the dictionary service.
pub const DICTIONARY: &str = "dictionary";
/// Breaker name of the exchange-rate service.
pub const EXCHANGE: &str = "exchange";
