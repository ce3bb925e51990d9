//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Payment request:
//!     → circuit_breaker.rs (admit or reject the primary call)
//!     → counts.rs (tally the outcome for the current generation)
//!     → clock.rs (deadlines for window resets and open cool-down)
//! ```
//!
//! # Design Decisions
//! - One breaker per upstream, constructed explicitly and injected
//! - Fail fast in Open state
//! - Bounded trials in Half-Open (default: one)

pub mod circuit_breaker;
pub mod clock;
pub mod counts;

pub use circuit_breaker::{BreakerError, BreakerSnapshot, CircuitBreaker, Settings, State};
pub use clock::{Clock, ManualClock, SystemClock};
pub use counts::Counts;
