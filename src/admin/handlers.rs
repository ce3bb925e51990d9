use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::resilience::{BreakerSnapshot, State as BreakerState};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breaker_state: BreakerState,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        breaker_state: state.dispatcher.breaker().state(),
    })
}

pub async fn get_breaker(State(state): State<AppState>) -> Json<BreakerSnapshot> {
    Json(state.dispatcher.breaker().snapshot())
}
