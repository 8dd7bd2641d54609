//! Aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! handler (country term, client address)
//!     → validation.rs (term rules, cache key)
//!     → security::rate_limit (per-client window)
//!     → cache::ttl (fresh aggregate? done)
//!     → orchestrator.rs (country lookup, then four-way fan-out)
//!     → types.rs (AggregateResult)
//!     → cache::ttl write
//! ```
//!
//! # Design Decisions
//! - All-or-nothing: no partial aggregate is ever returned or cached
//! - Validation and rate limiting run before any network I/O
//! - Errors carry enough detail for the HTTP layer to pick a status code

pub mod error;
pub mod orchestrator;
pub mod types;
pub mod validation;

pub use error::AggregateError;
pub use orchestrator::Aggregator;
pub use types::{AggregateResult, CurrencyConversion, WordOfTheDay};
