//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! Aggregation request (normalized country key)
//!     → ttl.rs get: fresh entry → returned as-is, no upstream traffic
//!     → miss / expired → full aggregation → ttl.rs set
//!
//! Background sweep (every cache.sweep_interval_ms):
//!     → purge expired entries
//! ```
//!
//! # Design Decisions
//! - Only complete aggregates are cached; a failed fan-out writes nothing
//! - Entries are immutable and shared via `Arc`
//! - Size-capped with oldest-first eviction

pub mod ttl;

pub use ttl::TtlCache;
