//! Primary/secondary payment dispatch.
//!
//! ```text
//! dispatch()
//!     → breaker.call(primary)      ok → Route::Primary
//!     → secondary                  ok → Route::Secondary
//!     → BothFailed
//! ```
//!
//! The secondary is only started after the primary path has fully resolved.
//! The breaker guards the primary alone.

use std::sync::Arc;
use std::time::Duration;

use crate::config::FailoverConfig;
use crate::payments::error::{DispatchError, GatewayError};
use crate::payments::gateway::{build_gateway, PaymentGateway};
use crate::payments::types::{Dispatched, Route};
use crate::resilience::circuit_breaker::{consecutive_failures, CircuitBreaker, Settings};

pub struct Dispatcher {
    breaker: CircuitBreaker,
    primary: Arc<dyn PaymentGateway>,
    secondary: Arc<dyn PaymentGateway>,
}

impl Dispatcher {
    pub fn new(
        breaker: CircuitBreaker,
        primary: Arc<dyn PaymentGateway>,
        secondary: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            breaker,
            primary,
            secondary,
        }
    }

    /// Build gateways and breaker from configuration.
    pub fn from_config(config: &FailoverConfig) -> Result<Self, GatewayError> {
        let primary = build_gateway("primary", &config.gateways.primary)?;
        let secondary = build_gateway("secondary", &config.gateways.secondary)?;

        let breaker_config = &config.breaker;
        let settings = Settings {
            name: breaker_config.name.clone(),
            max_requests: breaker_config.max_requests,
            interval: Duration::from_secs(breaker_config.interval_secs),
            timeout: Duration::from_secs(breaker_config.timeout_secs),
            ready_to_trip: consecutive_failures(breaker_config.trip_after_consecutive_failures),
            on_state_change: None,
        };

        tracing::info!(
            breaker = %settings.name,
            interval_secs = breaker_config.interval_secs,
            timeout_secs = breaker_config.timeout_secs,
            trip_after = breaker_config.trip_after_consecutive_failures,
            "Circuit breaker configured"
        );

        Ok(Self::new(CircuitBreaker::new(settings), primary, secondary))
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Process one payment, falling back to the secondary gateway if the
    /// primary is rejected or fails.
    pub async fn dispatch(&self) -> Result<Dispatched, DispatchError> {
        let primary_err = match self.breaker.call(|| self.primary.process()).await {
            Ok(()) => {
                tracing::debug!(gateway = %self.primary.name(), "Payment routed through primary");
                return Ok(Dispatched {
                    route: Route::Primary,
                });
            }
            Err(e) => {
                if e.is_rejection() {
                    tracing::debug!(
                        gateway = %self.primary.name(),
                        error = %e,
                        "Primary rejected by circuit breaker, falling back to secondary"
                    );
                } else {
                    tracing::warn!(
                        gateway = %self.primary.name(),
                        error = %e,
                        "Primary gateway failed, falling back to secondary"
                    );
                }
                DispatchError::from(e)
            }
        };

        match self.secondary.process().await {
            Ok(()) => Ok(Dispatched {
                route: Route::Secondary,
            }),
            Err(e) => {
                let secondary_err = DispatchError::SecondaryFailure(e);
                tracing::error!(
                    primary = %primary_err,
                    secondary = %secondary_err,
                    "Payment failed through both gateways"
                );
                Err(DispatchError::BothFailed {
                    primary: Box::new(primary_err),
                    secondary: Box::new(secondary_err),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{Counts, ManualClock, State};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Gateway whose outcome can be flipped at runtime.
    struct Scripted {
        name: &'static str,
        healthy: AtomicBool,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                healthy: AtomicBool::new(healthy),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PaymentGateway for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn process(&self) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(GatewayError::Declined {
                    gateway: self.name.to_string(),
                })
            }
        }
    }

    fn dispatcher(
        clock: &Arc<ManualClock>,
        primary: &Arc<Scripted>,
        secondary: &Arc<Scripted>,
    ) -> Dispatcher {
        let settings = Settings::new("PaymentGatewayCircuitBreaker")
            .with_interval(Duration::from_secs(5))
            .with_timeout(Duration::from_secs(5));
        Dispatcher::new(
            CircuitBreaker::with_clock(settings, clock.clone()),
            primary.clone(),
            secondary.clone(),
        )
    }

    #[tokio::test]
    async fn test_healthy_primary_always_wins() {
        let clock = Arc::new(ManualClock::new());
        let primary = Scripted::new("primary", true);
        let secondary = Scripted::new("secondary", true);
        let d = dispatcher(&clock, &primary, &secondary);

        for _ in 0..5 {
            let outcome = d.dispatch().await.unwrap();
            assert_eq!(outcome.route, Route::Primary);
            assert_eq!(outcome.message(), "Payment succeeded through primary gateway");
        }

        assert_eq!(primary.calls(), 5);
        assert_eq!(secondary.calls(), 0);
        assert_eq!(d.breaker().state(), State::Closed);
    }

    #[tokio::test]
    async fn test_open_breaker_skips_primary() {
        let clock = Arc::new(ManualClock::new());
        let primary = Scripted::new("primary", false);
        let secondary = Scripted::new("secondary", true);
        let d = dispatcher(&clock, &primary, &secondary);

        for _ in 0..3 {
            let outcome = d.dispatch().await.unwrap();
            assert_eq!(outcome.route, Route::Secondary);
        }
        assert_eq!(d.breaker().state(), State::Open);
        assert_eq!(primary.calls(), 3);

        let outcome = d.dispatch().await.unwrap();
        assert_eq!(outcome.route, Route::Secondary);
        assert_eq!(outcome.message(), "Payment succeeded through secondary gateway");
        assert_eq!(primary.calls(), 3, "open breaker must not invoke the primary");
        assert_eq!(secondary.calls(), 4);
    }

    #[tokio::test]
    async fn test_both_failed_when_secondary_fails_too() {
        let clock = Arc::new(ManualClock::new());
        let primary = Scripted::new("primary", false);
        let secondary = Scripted::new("secondary", false);
        let d = dispatcher(&clock, &primary, &secondary);

        // Primary ran and failed.
        let err = d.dispatch().await.unwrap_err();
        match &err {
            DispatchError::BothFailed { primary, secondary } => {
                assert!(matches!(**primary, DispatchError::PrimaryFailure(_)));
                assert!(matches!(**secondary, DispatchError::SecondaryFailure(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "payment failed through both gateways");

        d.dispatch().await.unwrap_err();
        d.dispatch().await.unwrap_err();
        assert_eq!(d.breaker().state(), State::Open);

        // Primary rejected by the open breaker.
        let err = d.dispatch().await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::BothFailed { ref primary, .. } if matches!(**primary, DispatchError::OpenState)
        ));
        assert_eq!(primary.calls(), 3);
    }

    #[tokio::test]
    async fn test_recovery_through_half_open_trial() {
        let clock = Arc::new(ManualClock::new());
        let primary = Scripted::new("primary", false);
        let secondary = Scripted::new("secondary", true);
        let d = dispatcher(&clock, &primary, &secondary);

        for _ in 0..3 {
            d.dispatch().await.unwrap();
        }
        assert_eq!(d.breaker().state(), State::Open);

        primary.set_healthy(true);
        clock.advance(Duration::from_secs(5));

        let outcome = d.dispatch().await.unwrap();
        assert_eq!(outcome.route, Route::Primary);
        assert_eq!(d.breaker().state(), State::Closed);
        assert_eq!(d.breaker().counts(), Counts::default());

        // One failure after recovery does not retrip.
        primary.set_healthy(false);
        assert_eq!(d.dispatch().await.unwrap().route, Route::Secondary);
        assert_eq!(d.breaker().state(), State::Closed);
        assert_eq!(d.breaker().counts().consecutive_failures, 1);
    }

    #[test]
    fn test_from_config_uses_breaker_section() {
        let mut config = FailoverConfig::default();
        config.breaker.name = "configured".into();
        config.breaker.timeout_secs = 9;

        let d = Dispatcher::from_config(&config).unwrap();
        let snapshot = d.breaker().snapshot();
        assert_eq!(snapshot.name, "configured");
        assert_eq!(snapshot.timeout_ms, 9_000);
        assert_eq!(snapshot.interval_ms, 5_000);
        assert_eq!(snapshot.state, State::Closed);
    }
}
