//! API error responses.
//!
//! Every handler returns `Result<_, ApiError>`; server-side failures are
//! logged with their full detail while clients get a short message and a
//! stable code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use catfecito_payments::PaymentError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {message}")]
    BadRequest { code: &'static str, message: String },

    #[error("Payments not configured")]
    PaymentsDisabled,
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Payment(err) => match err {
                PaymentError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
                PaymentError::AlreadyPaid(_) => (StatusCode::BAD_REQUEST, "ORDER_ALREADY_PAID"),
                PaymentError::EmptyOrder(_) => (StatusCode::BAD_REQUEST, "ORDER_EMPTY"),
                PaymentError::Provider(_) | PaymentError::Http(_) => {
                    (StatusCode::BAD_GATEWAY, "PAYMENT_PROVIDER_ERROR")
                }
                PaymentError::WebhookSignature(_) => {
                    (StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE")
                }
                PaymentError::WebhookParse(_) => (StatusCode::BAD_REQUEST, "INVALID_NOTIFICATION"),
                PaymentError::Config(_) | PaymentError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::BadRequest { code, .. } => (StatusCode::BAD_REQUEST, *code),
            Self::PaymentsDisabled => (StatusCode::SERVICE_UNAVAILABLE, "PAYMENTS_DISABLED"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Payment(err) => err.user_message().to_string(),
            Self::Unauthorized(_) => "Authentication required.".into(),
            Self::BadRequest { message, .. } => message.clone(),
            Self::PaymentsDisabled => "Payments not configured".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
        } else {
            tracing::debug!(error = %self, code, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.client_message(),
            code: code.into(),
        };
        (status, Json(body)).into_response()
    }
}
