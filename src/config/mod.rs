//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FailoverConfig (validated, immutable)
//!     → breaker settings and gateways built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breaker settings never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, FailoverConfig, GatewaysConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::ValidationError;
