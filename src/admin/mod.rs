//! Read-only admin API.
//!
//! - `GET /admin/status`: version and breaker state
//! - `GET /admin/breaker`: full breaker snapshot

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breaker", get(get_breaker))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailoverConfig;
    use crate::payments::{Dispatcher, StaticGateway};
    use crate::resilience::{CircuitBreaker, Settings};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let dispatcher = Dispatcher::new(
            CircuitBreaker::new(Settings::new("admin-test")),
            Arc::new(StaticGateway::succeeding("primary")),
            Arc::new(StaticGateway::succeeding("secondary")),
        );
        let mut config = FailoverConfig::default();
        config.admin.enabled = true;
        config.admin.api_key = "letmein".into();

        setup_admin_router(AppState {
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
        })
    }

    fn request(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_requires_bearer_key() {
        let response = router().oneshot(request("/admin/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router()
            .oneshot(request("/admin/status", Some("Bearer wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_breaker_snapshot() {
        let response = router()
            .oneshot(request("/admin/breaker", Some("Bearer letmein")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["name"], "admin-test");
        assert_eq!(json["state"], "closed");
        assert_eq!(json["counts"]["consecutive_failures"], 0);
        assert!(json["open_remaining_ms"].is_null());
    }
}
