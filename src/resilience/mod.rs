//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an upstream:
//!     → circuit_breaker.rs (reject fast if the upstream's breaker is open)
//!     → retries.rs (attempt loop with exponential backoff)
//!     → timeouts.rs (deadline on every attempt)
//!     → circuit_breaker.rs (record the loop's final outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - Breaker state is the only failure memory shared between requests
//! - Registries are owned by the service context and injected, never global

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreakerRegistry, CircuitOpenError, CircuitState};
pub use retries::{RetryPolicy, RetryingClient};
