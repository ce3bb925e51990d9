use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::request::request_id;
use crate::http::server::AppState;

/// `GET|POST /pay`: run one payment through the failover dispatcher.
pub async fn pay(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = request_id(&headers);

    match state.dispatcher.dispatch().await {
        Ok(dispatched) => {
            tracing::info!(
                request_id = %request_id,
                route = ?dispatched.route,
                "Payment processed"
            );
            dispatched.into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Payment failed");
            e.into_response()
        }
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
