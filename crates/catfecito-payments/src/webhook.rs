//! MercadoPago Webhook Handling
//!
//! Parses payment notifications, optionally verifies their signature, and
//! applies the reported payment outcome to the referenced order.

use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use catfecito_core::{OrderId, PaymentStatus, Settlement, ShopStore, StatusUpdate, UserId};

use crate::error::{PaymentError, Result};
use crate::provider::{PaymentProvider, ProviderPaymentStatus, de};

/// Parsed notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A payment was created or updated; details must be fetched by id
    Payment { payment_id: String },

    /// Merchant orders, chargebacks, ... (not acted upon)
    Other { topic: String },
}

#[derive(Debug, Default, Deserialize)]
struct NotificationBody {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    /// e.g. `payment.created`
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    data: Option<NotificationData>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationData {
    #[serde(default, deserialize_with = "de::opt_string_or_number")]
    id: Option<String>,
}

impl Notification {
    /// Parse a notification from its JSON body and query string.
    ///
    /// Webhooks post `{"type": "payment", "data": {"id": ...}}`; legacy IPN
    /// deliveries carry `?topic=payment&id=...` or `?type=payment&data.id=...`
    /// with an empty body.
    pub fn parse(body: &[u8], query: &HashMap<String, String>) -> Result<Self> {
        let parsed = if body.iter().all(u8::is_ascii_whitespace) {
            NotificationBody::default()
        } else {
            serde_json::from_slice::<NotificationBody>(body)
                .map_err(|e| PaymentError::WebhookParse(e.to_string()))?
        };

        let query_value = |key: &str| query.get(key).filter(|v| !v.is_empty()).cloned();

        let action_topic = parsed
            .action
            .as_deref()
            .and_then(|action| action.split('.').next())
            .filter(|topic| !topic.is_empty())
            .map(String::from);

        let topic = parsed
            .kind
            .or(parsed.topic)
            .or(action_topic)
            .or_else(|| query_value("type"))
            .or_else(|| query_value("topic"))
            .unwrap_or_default();

        if topic != "payment" {
            return Ok(Self::Other { topic });
        }

        let payment_id = parsed
            .data
            .and_then(|d| d.id)
            .or_else(|| query_value("data.id"))
            .or_else(|| query_value("id"))
            .ok_or_else(|| PaymentError::WebhookParse("payment notification without id".into()))?;

        // Payment ids are numeric; anything else never reaches the API
        if !payment_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PaymentError::WebhookParse(format!(
                "payment id '{payment_id}' is not numeric"
            )));
        }

        Ok(Self::Payment { payment_id })
    }

    /// Id the signature manifest is computed over
    pub fn data_id(&self) -> Option<&str> {
        match self {
            Self::Payment { payment_id } => Some(payment_id),
            Self::Other { .. } => None,
        }
    }
}

/// Verify the `x-signature` header of a notification.
///
/// The header looks like `ts=1704908010,v1=<hex>`; `v1` is the HMAC-SHA256
/// of `id:<data.id>;request-id:<x-request-id>;ts:<ts>;` keyed with the
/// webhook secret. Parts whose value is missing are left out of the manifest.
pub fn verify_signature(
    secret: &str,
    signature_header: &str,
    request_id: Option<&str>,
    data_id: Option<&str>,
) -> Result<()> {
    let mut ts = None;
    let mut v1 = None;
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }

    let ts = ts.ok_or_else(|| PaymentError::WebhookSignature("missing ts".into()))?;
    let v1 = v1.ok_or_else(|| PaymentError::WebhookSignature("missing v1".into()))?;
    let expected =
        hex::decode(v1).map_err(|e| PaymentError::WebhookSignature(format!("bad hex: {e}")))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::WebhookSignature(e.to_string()))?;
    mac.update(signature_manifest(ts, request_id, data_id).as_bytes());

    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::WebhookSignature("signature mismatch".into()))
}

fn signature_manifest(ts: &str, request_id: Option<&str>, data_id: Option<&str>) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        // Alphanumeric ids are signed in lowercase
        manifest.push_str(&format!("id:{};", id.to_lowercase()));
    }
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{request_id};"));
    }
    manifest.push_str(&format!("ts:{ts};"));
    manifest
}

/// What a notification did to the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Payment approved: order paid, stock decremented, cart cleared
    Settled {
        order_id: OrderId,
        user_id: UserId,
        items_decremented: usize,
        cart_items_cleared: u64,
    },

    /// Order was already approved; duplicate or late delivery
    AlreadySettled { order_id: OrderId },

    /// Pending or rejected payment recorded
    StatusUpdated {
        order_id: OrderId,
        status: PaymentStatus,
    },

    /// The external reference points at no order
    OrderNotFound { order_id: OrderId },

    /// Nothing to do
    Ignored { reason: String },
}

/// Webhook handler
pub struct WebhookHandler {
    store: Arc<dyn ShopStore>,
    provider: Arc<dyn PaymentProvider>,
}

impl WebhookHandler {
    pub fn new(store: Arc<dyn ShopStore>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { store, provider }
    }

    /// Process a notification
    pub async fn handle(&self, notification: &Notification) -> Result<WebhookOutcome> {
        let payment_id = match notification {
            Notification::Payment { payment_id } => payment_id,
            Notification::Other { topic } => {
                tracing::debug!(topic = %topic, "Unhandled notification topic");
                return Ok(WebhookOutcome::Ignored {
                    reason: format!("topic '{topic}'"),
                });
            }
        };

        let payment = self.provider.get_payment(payment_id).await?;

        tracing::info!(
            payment_id = %payment.id,
            status = ?payment.status,
            status_detail = ?payment.status_detail,
            external_reference = ?payment.external_reference,
            "Processing payment notification"
        );

        let Some(reference) = payment.external_reference.as_deref() else {
            return Ok(WebhookOutcome::Ignored {
                reason: "payment has no external reference".into(),
            });
        };
        let Ok(order_id) = reference.parse::<OrderId>() else {
            tracing::warn!(external_reference = %reference, "External reference is not an order id");
            return Ok(WebhookOutcome::Ignored {
                reason: format!("external reference '{reference}' is not an order id"),
            });
        };

        let status = match payment.status {
            ProviderPaymentStatus::Approved => return self.settle(order_id).await,
            ProviderPaymentStatus::Rejected => PaymentStatus::Rejected,
            ProviderPaymentStatus::Pending => PaymentStatus::Pending,
            ProviderPaymentStatus::Other(other) => {
                tracing::debug!(order_id = %order_id, status = %other, "Payment status not tracked");
                return Ok(WebhookOutcome::Ignored {
                    reason: format!("payment status '{other}'"),
                });
            }
        };

        let outcome = match self.store.set_payment_status(order_id, status).await? {
            StatusUpdate::Applied => {
                tracing::info!(order_id = %order_id, status = %status, "Recorded payment status");
                WebhookOutcome::StatusUpdated { order_id, status }
            }
            StatusUpdate::AlreadyApproved => {
                tracing::info!(
                    order_id = %order_id,
                    status = %status,
                    "Order already approved, keeping approval"
                );
                WebhookOutcome::AlreadySettled { order_id }
            }
            StatusUpdate::OrderNotFound => {
                tracing::error!(order_id = %order_id, "Order referenced by payment not found");
                WebhookOutcome::OrderNotFound { order_id }
            }
        };

        Ok(outcome)
    }

    async fn settle(&self, order_id: OrderId) -> Result<WebhookOutcome> {
        let outcome = match self.store.settle_approved(order_id).await? {
            Settlement::Applied {
                user_id,
                items_decremented,
                cart_items_cleared,
            } => {
                tracing::info!(
                    order_id = %order_id,
                    user_id = %user_id,
                    items_decremented,
                    cart_items_cleared,
                    "Order paid, stock decremented and cart cleared"
                );
                WebhookOutcome::Settled {
                    order_id,
                    user_id,
                    items_decremented,
                    cart_items_cleared,
                }
            }
            Settlement::AlreadyApproved => {
                tracing::info!(order_id = %order_id, "Duplicate approval ignored");
                WebhookOutcome::AlreadySettled { order_id }
            }
            Settlement::OrderNotFound => {
                tracing::error!(order_id = %order_id, "Order referenced by payment not found");
                WebhookOutcome::OrderNotFound { order_id }
            }
        };

        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, ts: &str, request_id: Option<&str>, data_id: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signature_manifest(ts, request_id, Some(data_id)).as_bytes());
    format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}
