//! # catfecito-core
//!
//! Domain model and storage abstraction shared by the Catfecito backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     catfecito-server                      │
//! │   ┌──────────────┐   ┌──────────────┐                    │
//! │   │   Checkout   │   │   Webhook    │──▶ PaymentProvider │
//! │   └──────┬───────┘   └──────┬───────┘                    │
//! │          └────────┬─────────┘                            │
//! │              ShopStore (Strategy)                         │
//! │        ┌──────────┴──────────┐                           │
//! │   PgShopStore         MemoryShopStore                    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod id;
pub mod model;
pub mod store;

pub use error::{Result, StoreError};
pub use id::{OrderId, ProductId, UserId};
pub use model::{
    CartItem, LineItem, Order, OrderPaymentView, OrderStatus, OrderWithPayer, Payer,
    PaymentStatus, Product, Settlement, StatusUpdate,
};
pub use store::{MemoryShopStore, ShopStore};
