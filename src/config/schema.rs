//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! payment service. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the payment failover service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct FailoverConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Circuit breaker guarding the primary gateway.
    pub breaker: BreakerConfig,

    /// Primary and secondary gateway definitions.
    pub gateways: GatewaysConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Breaker name for logs and the admin API.
    pub name: String,

    /// Closed-state counting window in seconds (0 disables resets).
    pub interval_secs: u64,

    /// Open cool-down in seconds before a trial call is allowed.
    pub timeout_secs: u64,

    /// Concurrent trial calls admitted while half-open.
    pub max_requests: u32,

    /// Consecutive primary failures that open the breaker.
    pub trip_after_consecutive_failures: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            name: "PaymentGatewayCircuitBreaker".to_string(),
            interval_secs: 5,
            timeout_secs: 5,
            max_requests: 1,
            trip_after_consecutive_failures: 3,
        }
    }
}

/// The two payment gateways.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GatewaysConfig {
    pub primary: UpstreamConfig,
    pub secondary: UpstreamConfig,
}

impl Default for GatewaysConfig {
    fn default() -> Self {
        Self {
            primary: UpstreamConfig::Http {
                url: "http://localhost:6666/payment".to_string(),
                timeout_ms: default_upstream_timeout_ms(),
            },
            secondary: UpstreamConfig::Static {
                succeed: true,
                latency_ms: 0,
            },
        }
    }
}

/// How a gateway is reached.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpstreamConfig {
    /// Remote gateway called with `POST <url>`.
    Http {
        url: String,
        #[serde(default = "default_upstream_timeout_ms")]
        timeout_ms: u64,
    },

    /// In-process gateway with a fixed outcome.
    Static {
        #[serde(default = "default_succeed")]
        succeed: bool,
        #[serde(default)]
        latency_ms: u64,
    },
}

fn default_upstream_timeout_ms() -> u64 {
    2_000
}

fn default_succeed() -> bool {
    true
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the `/admin` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
