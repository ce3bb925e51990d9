//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//! - Check gateway URLs and the bind address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FailoverConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{FailoverConfig, UpstreamConfig};

/// Upper bound for every configured duration (one week).
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not exceed {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("gateways.{gateway}.url '{url}' is invalid: {reason}")]
    GatewayUrl {
        gateway: &'static str,
        url: String,
        reason: String,
    },

    #[error("observability.log_level '{0}' is not a valid filter")]
    LogLevel(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingApiKey,
}

pub fn validate_config(config: &FailoverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let breaker = &config.breaker;
    if breaker.timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "breaker.timeout_secs",
        });
    }
    check_max(
        "breaker.timeout_secs",
        breaker.timeout_secs,
        MAX_DURATION_SECS,
        &mut errors,
    );
    check_max(
        "breaker.interval_secs",
        breaker.interval_secs,
        MAX_DURATION_SECS,
        &mut errors,
    );
    if breaker.max_requests == 0 {
        errors.push(ValidationError::Zero {
            field: "breaker.max_requests",
        });
    }
    if breaker.trip_after_consecutive_failures == 0 {
        errors.push(ValidationError::Zero {
            field: "breaker.trip_after_consecutive_failures",
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }
    check_max(
        "timeouts.request_secs",
        config.timeouts.request_secs,
        MAX_DURATION_SECS,
        &mut errors,
    );

    validate_upstream("primary", &config.gateways.primary, &mut errors);
    validate_upstream("secondary", &config.gateways.secondary, &mut errors);

    if tracing_subscriber::EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::LogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_upstream(
    gateway: &'static str,
    upstream: &UpstreamConfig,
    errors: &mut Vec<ValidationError>,
) {
    let (timeout_field, latency_field) = match gateway {
        "primary" => ("gateways.primary.timeout_ms", "gateways.primary.latency_ms"),
        _ => ("gateways.secondary.timeout_ms", "gateways.secondary.latency_ms"),
    };

    let (url, timeout_ms) = match upstream {
        UpstreamConfig::Http { url, timeout_ms } => (url, *timeout_ms),
        UpstreamConfig::Static { latency_ms, .. } => {
            check_max(latency_field, *latency_ms, MAX_DURATION_SECS * 1_000, errors);
            return;
        }
    };

    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(ValidationError::GatewayUrl {
            gateway,
            url: url.clone(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        }),
        Err(e) => errors.push(ValidationError::GatewayUrl {
            gateway,
            url: url.clone(),
            reason: e.to_string(),
        }),
    }

    if timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: timeout_field,
        });
    }
    check_max(timeout_field, timeout_ms, MAX_DURATION_SECS * 1_000, errors);
}

fn check_max(field: &'static str, value: u64, max: u64, errors: &mut Vec<ValidationError>) {
    if value > max {
        errors.push(ValidationError::TooLarge { field, max });
    }
}
