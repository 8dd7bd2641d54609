//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api/super-info?health=check
//!     → probe.rs (one GET per upstream base URL, in parallel)
//!     → HealthReport { services: name → up|down, errors }
//! ```
//!
//! # Design Decisions
//! - On demand only; no background polling
//! - Independent of the circuit breakers: a probe never trips or resets one

pub mod probe;

pub use probe::{HealthProbe, HealthReport, ProbeResult, ProbeStatus};
