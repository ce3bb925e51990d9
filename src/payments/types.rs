//! Payment dispatch types.

use serde::{Deserialize, Serialize};

/// Which gateway completed the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Primary,
    Secondary,
}

/// A successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    pub route: Route,
}

impl Dispatched {
    pub fn message(&self) -> &'static str {
        match self.route {
            Route::Primary => "Payment succeeded through primary gateway",
            Route::Secondary => "Payment succeeded through secondary gateway",
        }
    }
}

/// JSON body returned by the payment endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub message: String,
    pub success: bool,
}

impl PaymentResponse {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}
