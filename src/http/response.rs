//! Mapping dispatch outcomes to HTTP responses.
//!
//! Success is `200 {"message", "success": true}`; a failed dispatch is
//! `500 {"message", "success": false}` with the error text as message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::payments::{DispatchError, Dispatched, PaymentResponse};

impl IntoResponse for Dispatched {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(PaymentResponse::succeeded(self.message()))).into_response()
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PaymentResponse::failed(self.to_string())),
        )
            .into_response()
    }
}
