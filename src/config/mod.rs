//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → each subsystem takes the section it owns
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults, so an absent file yields the stock constants
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CacheConfig, CircuitBreakerConfig, ContentConfig, HealthConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, ServiceConfig, TimeoutConfig, UpstreamConfig,
    UpstreamsConfig,
};
