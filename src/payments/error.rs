//! Payment error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::resilience::BreakerError;

/// Failure of a single gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{gateway} payment gateway timed out after {after:?}")]
    Timeout { gateway: String, after: Duration },

    #[error("{gateway} payment gateway unreachable: {source}")]
    Transport {
        gateway: String,
        source: reqwest::Error,
    },

    #[error("{gateway} payment gateway answered with status {status}")]
    Status { gateway: String, status: u16 },

    #[error("{gateway} payment gateway declined the payment")]
    Declined { gateway: String },

    #[error("invalid gateway url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Outcome of a failed dispatch, or one of its causes.
///
/// Only [`DispatchError::BothFailed`] is ever returned by the dispatcher;
/// the other variants describe why each path failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The breaker rejected the primary call without running it.
    #[error("primary payment gateway skipped: circuit breaker is open")]
    OpenState,

    /// The half-open trial cap was exhausted.
    #[error("primary payment gateway skipped: too many half-open trial requests")]
    TooManyRequests,

    #[error("primary payment gateway failed: {0}")]
    PrimaryFailure(#[source] GatewayError),

    #[error("secondary payment gateway failed: {0}")]
    SecondaryFailure(#[source] GatewayError),

    #[error("payment failed through both gateways")]
    BothFailed {
        primary: Box<DispatchError>,
        secondary: Box<DispatchError>,
    },
}

impl From<BreakerError<GatewayError>> for DispatchError {
    fn from(err: BreakerError<GatewayError>) -> Self {
        match err {
            BreakerError::Open => DispatchError::OpenState,
            BreakerError::TooManyRequests => DispatchError::TooManyRequests,
            BreakerError::Inner(e) => DispatchError::PrimaryFailure(e),
        }
    }
}
