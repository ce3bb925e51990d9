//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: upstream assumed down, calls fail fast
//! - Half-Open: a bounded number of trial calls probe recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: ready_to_trip(counts) after a failure
//! Closed → Closed (new generation): interval elapsed
//! Open → Half-Open: timeout elapsed
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails
//! ```
//!
//! # Generations
//! Every transition (and every Closed interval reset) starts a new
//! generation with zeroed counts. A call records the generation it was
//! admitted in; if the generation moved on by the time the call finishes,
//! its outcome is dropped.
//!
//! Bookkeeping happens under a mutex. The wrapped operation runs outside of
//! it, so slow upstream calls never serialize each other.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::counts::Counts;

/// Open cool-down used when the configured timeout is zero.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Consecutive failures that trip the default predicate.
pub const DEFAULT_TRIP_THRESHOLD: u32 = 3;

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Closed => write!(f, "closed"),
            State::Open => write!(f, "open"),
            State::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not invoked.
    #[error("circuit breaker is open")]
    Open,

    /// The half-open trial cap is used up; the operation was not invoked.
    #[error("too many requests")]
    TooManyRequests,

    /// The operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// True when the breaker refused the call without running it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BreakerError::Open | BreakerError::TooManyRequests)
    }
}

/// Decides from the current counts whether a Closed breaker should open.
pub type TripPredicate = Arc<dyn Fn(&Counts) -> bool + Send + Sync>;

/// Called with `(name, from, to)` after every state transition.
pub type StateChangeHook = Arc<dyn Fn(&str, State, State) + Send + Sync>;

/// Trip once `threshold` failures happened in a row.
pub fn consecutive_failures(threshold: u32) -> TripPredicate {
    Arc::new(move |counts: &Counts| counts.consecutive_failures >= threshold)
}

/// Breaker settings, fixed at construction.
#[derive(Clone)]
pub struct Settings {
    /// Label used in logs and snapshots.
    pub name: String,
    /// Trial calls admitted per half-open generation. Zero means one.
    pub max_requests: u32,
    /// Closed-state counting window. Zero disables periodic resets.
    pub interval: Duration,
    /// Open cool-down before a trial is allowed. Zero means [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
    pub ready_to_trip: TripPredicate,
    pub on_state_change: Option<StateChangeHook>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_requests: 1,
            interval: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            ready_to_trip: consecutive_failures(DEFAULT_TRIP_THRESHOLD),
            on_state_change: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.name)
            .field("max_requests", &self.max_requests)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ready_to_trip<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Counts) -> bool + Send + Sync + 'static,
    {
        self.ready_to_trip = Arc::new(predicate);
        self
    }

    pub fn with_state_change_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(hook));
        self
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: State,
    pub generation: u64,
    pub counts: Counts,
    pub max_requests: u32,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
}

/// State plus the deadline that only exists in that state.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { reset_at: Option<Instant> },
    /// `until` is `None` when `now + timeout` is not representable; the
    /// breaker then stays open.
    Open { until: Option<Instant> },
    HalfOpen,
}

impl Phase {
    fn state(&self) -> State {
        match self {
            Phase::Closed { .. } => State::Closed,
            Phase::Open { .. } => State::Open,
            Phase::HalfOpen => State::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    generation: u64,
    counts: Counts,
}

type Transition = (State, State);

enum Rejection {
    Open,
    TooManyRequests,
}

/// Circuit breaker state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: Settings,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(settings: Settings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Create a breaker reading time from `clock`.
    pub fn with_clock(mut settings: Settings, clock: Arc<dyn Clock>) -> Self {
        if settings.max_requests == 0 {
            settings.max_requests = 1;
        }
        if settings.timeout.is_zero() {
            settings.timeout = DEFAULT_TIMEOUT;
        }

        let reset_at = window_end(clock.now(), settings.interval);
        Self {
            settings,
            clock,
            inner: Mutex::new(Inner {
                phase: Phase::Closed { reset_at },
                generation: 0,
                counts: Counts::default(),
            }),
        }
    }

    /// Run `operation` if the breaker admits it and record the outcome.
    ///
    /// If the returned future is dropped after admission but before the
    /// operation finished, the call is recorded as a failure.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = match self.admit() {
            Ok(permit) => permit,
            Err(Rejection::Open) => return Err(BreakerError::Open),
            Err(Rejection::TooManyRequests) => return Err(BreakerError::TooManyRequests),
        };

        let outcome = operation().await;
        permit.settle(outcome.is_ok());
        outcome.map_err(BreakerError::Inner)
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn state(&self) -> State {
        self.snapshot().state
    }

    pub fn counts(&self) -> Counts {
        self.snapshot().counts
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// Current state, applying any transition that is due by now.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = self.clock.now();
        let (snapshot, transition) = {
            let mut inner = self.lock();
            let transition = self.refresh(&mut inner, now);
            let open_remaining_ms = match inner.phase {
                Phase::Open { until } => Some(
                    until.map_or(u64::MAX, |until| millis(until.saturating_duration_since(now))),
                ),
                _ => None,
            };
            let snapshot = BreakerSnapshot {
                name: self.settings.name.clone(),
                state: inner.phase.state(),
                generation: inner.generation,
                counts: inner.counts,
                max_requests: self.settings.max_requests,
                interval_ms: millis(self.settings.interval),
                timeout_ms: millis(self.settings.timeout),
                open_remaining_ms,
            };
            (snapshot, transition)
        };
        self.notify(transition);
        snapshot
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section leaves `Inner` consistent, so a poisoned
        // lock still holds usable state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn admit(&self) -> Result<Permit<'_>, Rejection> {
        let now = self.clock.now();
        let (admitted, transition) = {
            let mut inner = self.lock();
            let transition = self.refresh(&mut inner, now);
            let admitted = match inner.phase {
                Phase::Open { .. } => Err(Rejection::Open),
                Phase::HalfOpen if inner.counts.requests >= self.settings.max_requests => {
                    Err(Rejection::TooManyRequests)
                }
                _ => {
                    inner.counts.on_request();
                    Ok(inner.generation)
                }
            };
            (admitted, transition)
        };
        self.notify(transition);

        match &admitted {
            Err(Rejection::Open) => {
                tracing::debug!(breaker = %self.settings.name, "Call rejected: breaker open");
            }
            Err(Rejection::TooManyRequests) => {
                tracing::debug!(breaker = %self.settings.name, "Call rejected: half-open trial cap reached");
            }
            Ok(_) => {}
        }

        admitted.map(|generation| Permit {
            breaker: self,
            generation,
            settled: false,
        })
    }

    fn on_result(&self, generation: u64, success: bool) {
        let now = self.clock.now();
        let transition = {
            let mut inner = self.lock();
            let refreshed = self.refresh(&mut inner, now);
            if generation != inner.generation {
                tracing::debug!(
                    breaker = %self.settings.name,
                    call_generation = generation,
                    current_generation = inner.generation,
                    success,
                    "Discarding outcome from a previous generation"
                );
                refreshed
            } else if success {
                self.record_success(&mut inner, now)
            } else {
                self.record_failure(&mut inner, now)
            }
        };
        self.notify(transition);
    }

    fn record_success(&self, inner: &mut Inner, now: Instant) -> Option<Transition> {
        match inner.phase {
            Phase::Closed { .. } => {
                inner.counts.on_success();
                None
            }
            Phase::HalfOpen => {
                inner.counts.on_success();
                self.set_state(inner, State::Closed, now)
            }
            Phase::Open { .. } => None,
        }
    }

    fn record_failure(&self, inner: &mut Inner, now: Instant) -> Option<Transition> {
        match inner.phase {
            Phase::Closed { .. } => {
                inner.counts.on_failure();
                if (self.settings.ready_to_trip)(&inner.counts) {
                    self.set_state(inner, State::Open, now)
                } else {
                    None
                }
            }
            Phase::HalfOpen => self.set_state(inner, State::Open, now),
            Phase::Open { .. } => None,
        }
    }

    /// Apply time-driven transitions.
    fn refresh(&self, inner: &mut Inner, now: Instant) -> Option<Transition> {
        match inner.phase {
            Phase::Closed {
                reset_at: Some(reset_at),
            } if now >= reset_at => {
                inner.phase = Phase::Closed {
                    reset_at: window_end(now, self.settings.interval),
                };
                next_generation(inner);
                tracing::trace!(
                    breaker = %self.settings.name,
                    generation = inner.generation,
                    "Counting window elapsed, counts reset"
                );
                None
            }
            Phase::Open {
                until: Some(until),
            } if now >= until => self.set_state(inner, State::HalfOpen, now),
            _ => None,
        }
    }

    fn set_state(&self, inner: &mut Inner, to: State, now: Instant) -> Option<Transition> {
        let from = inner.phase.state();
        if from == to {
            return None;
        }

        inner.phase = match to {
            State::Closed => Phase::Closed {
                reset_at: window_end(now, self.settings.interval),
            },
            State::Open => Phase::Open {
                until: now.checked_add(self.settings.timeout),
            },
            State::HalfOpen => Phase::HalfOpen,
        };
        next_generation(inner);
        Some((from, to))
    }

    /// Log and publish a transition. Must be called without the lock held.
    fn notify(&self, transition: Option<Transition>) {
        let Some((from, to)) = transition else {
            return;
        };

        if to == State::Open {
            tracing::warn!(
                breaker = %self.settings.name,
                from = %from,
                to = %to,
                timeout_ms = millis(self.settings.timeout),
                "Circuit breaker state changed"
            );
        } else {
            tracing::info!(
                breaker = %self.settings.name,
                from = %from,
                to = %to,
                "Circuit breaker state changed"
            );
        }

        if let Some(hook) = &self.settings.on_state_change {
            hook(&self.settings.name, from, to);
        }
    }
}

fn next_generation(inner: &mut Inner) {
    inner.generation += 1;
    inner.counts.reset();
}

/// End of the counting window starting at `now`. `None` disables resets,
/// either because the interval is zero or because it overflows `Instant`.
fn window_end(now: Instant, interval: Duration) -> Option<Instant> {
    if interval.is_zero() {
        None
    } else {
        now.checked_add(interval)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Admission ticket for one call. Dropping it unsettled records a failure.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.on_result(self.generation, success);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(
                breaker = %self.breaker.settings.name,
                generation = self.generation,
                "Call abandoned before completion, recording failure"
            );
            self.breaker.on_result(self.generation, false);
        }
    }
}
