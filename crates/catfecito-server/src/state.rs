//! Application State

use std::sync::Arc;

use catfecito_core::ShopStore;
use catfecito_payments::{Checkout, CheckoutSettings, PaymentProvider, WebhookHandler};

use crate::auth::JwtKeys;

/// Payment services, present only when a provider is configured
pub struct Payments {
    pub checkout: Checkout,
    pub webhooks: WebhookHandler,

    /// Notifications must be signed with this secret when set
    pub webhook_secret: Option<String>,
}

impl Payments {
    pub fn new(
        store: Arc<dyn ShopStore>,
        provider: Arc<dyn PaymentProvider>,
        settings: CheckoutSettings,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            checkout: Checkout::new(store.clone(), provider.clone(), settings),
            webhooks: WebhookHandler::new(store, provider),
            webhook_secret,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Orders, products and carts (PostgreSQL in production)
    pub store: Arc<dyn ShopStore>,

    /// Payment services (None if MercadoPago is not configured)
    pub payments: Option<Arc<Payments>>,

    /// Verifies user bearer tokens
    pub jwt: Arc<JwtKeys>,
}
