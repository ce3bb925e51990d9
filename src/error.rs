//! Startup error type for the payment service.

use thiserror::Error;

use crate::config::ConfigError;
use crate::payments::GatewayError;

/// Errors that stop the service from starting or serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway setup error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Logging setup error: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for service setup.
pub type AppResult<T> = Result<T, AppError>;
