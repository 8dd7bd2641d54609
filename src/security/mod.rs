//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming aggregation request:
//!     → input validation (aggregate::validation)
//!     → rate_limit.rs (check per-client sliding window)
//!     → Pass to cache / upstream fan-out
//! ```
//!
//! # Design Decisions
//! - Abuse checks are local and run before any network I/O
//! - Fail closed: a client over its limit gets 429, nothing else happens
//! - Memory is bounded by a periodic sweep, independent of request volume

pub mod rate_limit;

pub use rate_limit::SlidingWindowRateLimiter;
