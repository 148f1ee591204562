//! # catfecito-payments
//!
//! MercadoPago Checkout Pro integration for the Catfecito storefront.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  create-preference  ┌─────────────────┐  redirect   ┌─────────────┐
//! │  Storefront │────────────────────▶│  Checkout Pro   │────────────▶│  Storefront │
//! │   (order)   │                     │  (hosted page)  │             │  (result)   │
//! └─────────────┘                     └────────┬────────┘             └─────────────┘
//!                                              │ webhook (payment id)
//!                                              ▼
//!                                     ┌─────────────────┐
//!                                     │ WebhookHandler  │── settle / record status
//!                                     └─────────────────┘
//! ```
//!
//! The order id travels as the preference's `external_reference` and comes
//! back on every payment, which is how notifications find their order.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catfecito_payments::{Checkout, CheckoutSettings, MercadoPagoClient};
//!
//! let provider = Arc::new(MercadoPagoClient::from_env()?);
//! let checkout = Checkout::new(store, provider, CheckoutSettings::from_env());
//!
//! let created = checkout.create_preference(user_id, order_id).await?;
//! // Redirect buyer to: created.init_point
//! ```

mod checkout;
mod error;
mod mercadopago;
mod mock;
mod provider;
mod webhook;

pub use checkout::{Checkout, CheckoutSettings, PreferenceCreated, payment_status};
pub use error::{PaymentError, Result};
pub use mercadopago::{MercadoPagoClient, MercadoPagoConfig};
pub use mock::MockPaymentProvider;
pub use provider::{
    BackUrls, PaymentInfo, PaymentProvider, Preference, PreferenceItem, PreferenceMetadata,
    PreferencePayer, PreferenceRequest, ProviderPaymentStatus,
};
pub use webhook::{Notification, WebhookHandler, WebhookOutcome, verify_signature};
