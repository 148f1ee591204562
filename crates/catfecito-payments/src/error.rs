//! Payment Error Types

use catfecito_core::{OrderId, StoreError};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Order does not exist or belongs to someone else
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Order already settled
    #[error("Order {0} has already been paid")]
    AlreadyPaid(OrderId),

    /// Order has no line items to charge for
    #[error("Order {0} has no items")]
    EmptyOrder(OrderId),

    /// Payment provider rejected or failed the call
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Transport error talking to the provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PaymentError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(_) | Self::Http(_) => true,
            Self::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::OrderNotFound(_) => "Order not found.",
            Self::AlreadyPaid(_) => "This order has already been paid.",
            Self::EmptyOrder(_) => "This order has no items.",
            Self::Provider(_) | Self::Http(_) => "Payment processing failed. Please try again.",
            Self::WebhookSignature(_) => "Invalid webhook signature.",
            Self::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}
