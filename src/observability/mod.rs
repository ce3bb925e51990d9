//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! HTTP layer adds:
//!     → request spans (tower-http TraceLayer)
//!     → x-request-id correlation header
//! ```

pub mod logging;

pub use logging::init_logging;
