//! HTTP Handlers

use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use catfecito_core::{OrderId, OrderPaymentView};
use catfecito_payments::{
    Notification, PaymentError, PreferenceCreated, payment_status, verify_signature,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::{AppState, Payments};

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payments_configured: bool,
}

/// Order ids arrive as numbers from the SPA and as strings from forms
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OrderIdInput {
    Number(i32),
    Text(String),
}

impl OrderIdInput {
    fn parse(&self) -> Option<OrderId> {
        match self {
            Self::Number(id) => Some(OrderId::new(*id)),
            Self::Text(text) => text.parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePreferenceRequest {
    #[serde(default)]
    pub order_id: Option<OrderIdInput>,
}

#[derive(Debug, Serialize)]
pub struct CreatePreferenceResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(flatten)]
    pub preference: PreferenceCreated,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub order: OrderPaymentView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
}

fn payments(state: &AppState) -> Result<&Payments, ApiError> {
    state.payments.as_deref().ok_or(ApiError::PaymentsDisabled)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payments_configured: state.payments.is_some(),
    })
}

/// Create a MercadoPago preference for one of the caller's orders
pub async fn create_preference(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreatePreferenceRequest>, JsonRejection>,
) -> Result<Json<CreatePreferenceResponse>, ApiError> {
    let Json(payload) =
        payload.map_err(|e| ApiError::bad_request("INVALID_BODY", e.body_text()))?;

    let order_id = match payload.order_id {
        None => return Err(ApiError::bad_request("MISSING_ORDER_ID", "order_id is required")),
        Some(input) => input
            .parse()
            .ok_or_else(|| ApiError::bad_request("INVALID_ORDER_ID", "order_id must be an integer"))?,
    };

    tracing::debug!(user_id = %user.id, email = ?user.email, order_id = %order_id, "Checkout requested");

    let payments = payments(&state)?;
    let preference = payments
        .checkout
        .create_preference(user.id, order_id)
        .await?;

    Ok(Json(CreatePreferenceResponse {
        success: true,
        message: "Payment preference created",
        preference,
    }))
}

/// MercadoPago notification endpoint.
///
/// Answers 200 for everything it could read, including notifications that
/// failed downstream, so the provider does not keep redelivering them.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payments = payments(&state)?;
    let ack = (StatusCode::OK, Json(WebhookAck { success: true })).into_response();

    let notification = match Notification::parse(&body, &query) {
        Ok(notification) => notification,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable payment notification");
            return Ok(ack);
        }
    };

    if let Some(secret) = payments.webhook_secret.as_deref() {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let signature = header("x-signature")
            .ok_or_else(|| PaymentError::WebhookSignature("missing x-signature header".into()))?;

        verify_signature(
            secret,
            signature,
            header("x-request-id"),
            notification.data_id(),
        )
        .inspect_err(|e| tracing::warn!(error = %e, "Rejected notification"))?;
    }

    match payments.webhooks.handle(&notification).await {
        Ok(outcome) => tracing::debug!(?outcome, "Notification processed"),
        Err(e) => tracing::error!(
            error = %e,
            payment_id = ?notification.data_id(),
            "Notification processing failed"
        ),
    }

    Ok(ack)
}

/// Stored payment status of one of the caller's orders
pub async fn get_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    order_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let Path(order_id) = order_id
        .map_err(|_| ApiError::bad_request("INVALID_ORDER_ID", "order_id must be an integer"))?;

    let order = payment_status(state.store.as_ref(), user.id, OrderId::new(order_id)).await?;

    Ok(Json(PaymentStatusResponse {
        success: true,
        order,
    }))
}
