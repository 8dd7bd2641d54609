//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build aggregator → Spawn sweepers → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received (signals.rs) → broadcast → sweepers exit, server drains
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listener
//! - Every background task subscribes to the same shutdown broadcast

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
