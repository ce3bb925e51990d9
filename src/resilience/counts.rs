//! Per-generation request tallies.
//!
//! A `Counts` value only describes the breaker generation it was collected
//! in. The breaker calls [`Counts::reset`] whenever the generation changes.

use serde::Serialize;

/// Success/failure tallies for the current breaker generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Calls admitted in this generation.
    pub requests: u32,
    pub successes: u32,
    pub failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    /// Zero every tally.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub fn on_success(&mut self) {
        self.successes = self.successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub fn on_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }
}
