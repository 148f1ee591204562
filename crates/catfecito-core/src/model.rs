//! Storefront Data Model
//!
//! Orders, their line items, products and cart entries as the payment flow
//! sees them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::id::{OrderId, ProductId, UserId};

/// Fulfillment status of an order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the text stored in the `orders.status` column
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StoreError::DataCorruption(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status recorded on an order
///
/// Mirrors the three provider outcomes the store acts on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the text stored in the `orders.payment_status` column
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(StoreError::DataCorruption(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,

    /// Provider preference id, set once a checkout has been started
    pub payment_id: Option<String>,

    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// An order counts as paid once either the payment or the fulfillment
    /// side says so.
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Approved || self.status == OrderStatus::Paid
    }
}

/// Name and email of the user paying for an order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    pub email: String,
}

/// An order joined with its owner
#[derive(Clone, Debug)]
pub struct OrderWithPayer {
    pub order: Order,
    pub payer: Payer,
}

/// An order line joined with the product it refers to
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i32,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_description: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub stock: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i32,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Stored payment fields of an order, as exposed to its owner
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderPaymentView {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderPaymentView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            total: order.total,
            status: order.status,
            payment_status: order.payment_status,
            payment_id: order.payment_id.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Result of applying an approved payment to an order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Order flipped to paid, stock decremented and cart cleared
    Applied {
        user_id: UserId,
        items_decremented: usize,
        cart_items_cleared: u64,
    },

    /// The order was already approved; nothing was touched
    AlreadyApproved,

    OrderNotFound,
}

/// Result of recording a pending or rejected payment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,

    /// Approved orders never move back to pending or rejected
    AlreadyApproved,

    OrderNotFound,
}
