//! Checkout Pro Integration
//!
//! Turns an unpaid order into a MercadoPago preference and hands back the
//! hosted checkout link the buyer is redirected to.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catfecito_core::{OrderId, OrderPaymentView, ShopStore, UserId};

use crate::error::{PaymentError, Result};
use crate::provider::{
    BackUrls, PaymentProvider, PreferenceItem, PreferenceMetadata, PreferencePayer,
    PreferenceRequest,
};

const DEFAULT_ITEM_DESCRIPTION: &str = "Producto de Catfecito";

/// Settings applied to every preference
#[derive(Clone, Debug)]
pub struct CheckoutSettings {
    /// ISO currency of the MercadoPago account (e.g. `ARS`)
    pub currency_id: String,

    /// Public URL of this backend; the webhook path is appended to it
    pub backend_url: String,

    /// Storefront URL for post-checkout redirects; omitted when unset
    pub frontend_url: Option<String>,

    /// Text shown on the buyer's card statement
    pub statement_descriptor: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            currency_id: "ARS".into(),
            backend_url: "http://localhost:3000".into(),
            frontend_url: None,
            statement_descriptor: "CATFECITO".into(),
        }
    }
}

impl CheckoutSettings {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            currency_id: var("CURRENCY_ID").unwrap_or(defaults.currency_id),
            backend_url: var("BACKEND_URL").unwrap_or(defaults.backend_url),
            frontend_url: var("FRONTEND_URL"),
            statement_descriptor: var("STATEMENT_DESCRIPTOR")
                .unwrap_or(defaults.statement_descriptor),
        }
    }

    /// URL the provider posts notifications to
    pub fn notification_url(&self) -> String {
        format!("{}/api/payments/webhook", self.backend_url.trim_end_matches('/'))
    }

    fn back_urls(&self) -> Option<BackUrls> {
        let base = self.frontend_url.as_deref()?.trim_end_matches('/');
        Some(BackUrls {
            success: format!("{base}/checkout/success"),
            failure: format!("{base}/checkout/failure"),
            pending: format!("{base}/checkout/pending"),
        })
    }
}

/// Result of creating a preference for an order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreferenceCreated {
    pub preference_id: String,

    /// Link to pay
    pub init_point: Option<String>,

    /// Test link
    pub sandbox_init_point: Option<String>,

    pub order_id: OrderId,
    pub total: Decimal,
}

/// Checkout service
pub struct Checkout {
    store: Arc<dyn ShopStore>,
    provider: Arc<dyn PaymentProvider>,
    settings: CheckoutSettings,
}

impl Checkout {
    pub fn new(
        store: Arc<dyn ShopStore>,
        provider: Arc<dyn PaymentProvider>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    pub const fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// Create a payment preference for one of the user's orders.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the order does not exist or is not the user's
    /// - `AlreadyPaid` if the order's payment was already approved
    /// - `EmptyOrder` if the order has no line items
    /// - `Provider`/`Http` if MercadoPago fails
    pub async fn create_preference(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<PreferenceCreated> {
        let found = self
            .store
            .find_order_for_user(order_id, user_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id))?;

        if found.order.is_paid() {
            return Err(PaymentError::AlreadyPaid(order_id));
        }

        let lines = self.store.line_items(order_id).await?;
        if lines.is_empty() {
            return Err(PaymentError::EmptyOrder(order_id));
        }

        let items = lines
            .into_iter()
            .map(|line| PreferenceItem {
                id: line.id.to_string(),
                title: line.product_name,
                description: line
                    .product_description
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| DEFAULT_ITEM_DESCRIPTION.into()),
                quantity: line.quantity,
                unit_price: line.unit_price,
                currency_id: self.settings.currency_id.clone(),
            })
            .collect();

        let back_urls = self.settings.back_urls();
        let request = PreferenceRequest {
            items,
            payer: PreferencePayer {
                name: found.payer.name,
                email: found.payer.email,
            },
            external_reference: order_id.to_string(),
            notification_url: self.settings.notification_url(),
            statement_descriptor: self.settings.statement_descriptor.clone(),
            metadata: PreferenceMetadata { order_id, user_id },
            auto_return: back_urls.as_ref().map(|_| "approved".to_string()),
            back_urls,
        };

        let preference = self.provider.create_preference(&request).await?;

        tracing::info!(
            order_id = %order_id,
            user_id = %user_id,
            preference_id = %preference.id,
            provider = self.provider.name(),
            "Created payment preference"
        );

        if !self
            .store
            .set_payment_reference(order_id, &preference.id)
            .await?
        {
            tracing::warn!(order_id = %order_id, "Order vanished before its preference was saved");
        }

        Ok(PreferenceCreated {
            preference_id: preference.id,
            init_point: preference.init_point,
            sandbox_init_point: preference.sandbox_init_point,
            order_id,
            total: found.order.total,
        })
    }
}

/// Stored payment fields of one of the user's orders.
///
/// # Errors
///
/// `OrderNotFound` if the order does not exist or is not the user's.
pub async fn payment_status(
    store: &dyn ShopStore,
    user_id: UserId,
    order_id: OrderId,
) -> Result<OrderPaymentView> {
    store
        .payment_view(order_id, user_id)
        .await?
        .ok_or(PaymentError::OrderNotFound(order_id))
}
