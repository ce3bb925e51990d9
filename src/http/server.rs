//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the payment, health and admin handlers
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Bind server to listener and drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::FailoverConfig;
use crate::http::payment::{health, pay};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::payments::{Dispatcher, GatewayError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<FailoverConfig>,
}

/// HTTP server for the payment service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server with gateways and breaker built from `config`.
    pub fn new(config: FailoverConfig) -> Result<Self, GatewayError> {
        let dispatcher = Arc::new(Dispatcher::from_config(&config)?);
        Ok(Self::with_dispatcher(config, dispatcher))
    }

    /// Create a server around an already built dispatcher.
    pub fn with_dispatcher(config: FailoverConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            dispatcher,
            config: config.clone(),
        };
        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &FailoverConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/pay", get(pay).post(pay))
            .route("/health", get(health))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state));
        }

        router.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id(request.headers()),
                        )
                    }),
                )
                .layer(propagate_request_id_layer())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.timeouts.request_secs,
                ))),
        )
    }

    /// The router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
