//! Payment failover service library.
//!
//! A circuit breaker guards the primary payment gateway; when the primary is
//! failing or the breaker is open, payments fall back to a secondary gateway.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod payments;
pub mod resilience;

pub use config::schema::FailoverConfig;
pub use error::{AppError, AppResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use payments::Dispatcher;
pub use resilience::CircuitBreaker;
