//! Payment failover subsystem.
//!
//! # Data Flow
//! ```text
//! /pay handler
//!     → dispatcher.rs (breaker-guarded primary, then secondary)
//!     → gateway.rs (HTTP or in-process gateway call)
//!     → types.rs (route taken, response body)
//! ```

pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod types;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, GatewayError};
pub use gateway::{build_gateway, HttpGateway, PaymentGateway, StaticGateway};
pub use types::{Dispatched, PaymentResponse, Route};
