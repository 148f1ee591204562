//! Storage Abstraction
//!
//! Every database statement the payment flow issues goes through
//! [`ShopStore`]. PostgreSQL lives in `catfecito-db`; [`MemoryShopStore`]
//! backs development and tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::id::{OrderId, ProductId, UserId};
use crate::model::{
    CartItem, LineItem, Order, OrderPaymentView, OrderStatus, OrderWithPayer, Payer,
    PaymentStatus, Product, Settlement, StatusUpdate,
};

/// Storage operations used by checkout, webhooks and status lookups
#[async_trait]
pub trait ShopStore: Send + Sync {
    /// Load an order together with its owner, only if `user_id` owns it
    async fn find_order_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderWithPayer>>;

    /// Line items of an order, joined with product name and description
    async fn line_items(&self, order_id: OrderId) -> Result<Vec<LineItem>>;

    /// Record the provider preference id on the order.
    ///
    /// Returns `false` when the order does not exist.
    async fn set_payment_reference(&self, order_id: OrderId, preference_id: &str)
    -> Result<bool>;

    /// Apply an approved payment atomically: mark the order paid, decrement
    /// stock for each line item and clear the owner's cart.
    ///
    /// Must be a no-op for an order whose payment is already approved.
    async fn settle_approved(&self, order_id: OrderId) -> Result<Settlement>;

    /// Record a pending or rejected payment without touching stock or cart
    async fn set_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<StatusUpdate>;

    /// Stored payment fields of an order, only if `user_id` owns it
    async fn payment_view(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderPaymentView>>;
}

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, Payer>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<(i32, ProductId, i32, rust_decimal::Decimal)>>,
    cart_items: Vec<CartItem>,
    next_row_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_row_id += 1;
        self.next_row_id
    }
}

/// In-memory store (for development and tests)
///
/// A single lock guards all tables, so `settle_approved` is atomic the same
/// way the PostgreSQL transaction is.
#[derive(Default)]
pub struct MemoryShopStore {
    tables: RwLock<Tables>,
}

impl MemoryShopStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, id: UserId, name: &str, email: &str) {
        let mut tables = self.tables.write().await;
        tables.users.insert(
            id,
            Payer {
                name: name.to_string(),
                email: email.to_string(),
            },
        );
    }

    pub async fn insert_product(&self, product: Product) {
        let mut tables = self.tables.write().await;
        tables.products.insert(product.id, product);
    }

    pub async fn insert_order(&self, order: Order) {
        let mut tables = self.tables.write().await;
        tables.orders.insert(order.id, order);
    }

    /// Add a line to an order; returns the generated order-item id
    pub async fn insert_order_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
        unit_price: rust_decimal::Decimal,
    ) -> i32 {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables
            .order_items
            .entry(order_id)
            .or_default()
            .push((id, product_id, quantity, unit_price));
        id
    }

    pub async fn insert_cart_item(&self, user_id: UserId, product_id: ProductId, quantity: i32) {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables.cart_items.push(CartItem {
            id,
            user_id,
            product_id,
            quantity,
        });
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.tables.read().await.products.get(&id).cloned()
    }

    pub async fn order(&self, id: OrderId) -> Option<Order> {
        self.tables.read().await.orders.get(&id).cloned()
    }

    pub async fn cart_items(&self, user_id: UserId) -> Vec<CartItem> {
        self.tables
            .read()
            .await
            .cart_items
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ShopStore for MemoryShopStore {
    async fn find_order_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderWithPayer>> {
        let tables = self.tables.read().await;

        let Some(order) = tables.orders.get(&order_id).filter(|o| o.user_id == user_id) else {
            return Ok(None);
        };
        // Inner join: an order whose owner row is gone is not found
        let Some(payer) = tables.users.get(&user_id) else {
            return Ok(None);
        };

        Ok(Some(OrderWithPayer {
            order: order.clone(),
            payer: payer.clone(),
        }))
    }

    async fn line_items(&self, order_id: OrderId) -> Result<Vec<LineItem>> {
        let tables = self.tables.read().await;

        let items = tables
            .order_items
            .get(&order_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|&(id, product_id, quantity, unit_price)| {
                let product = tables.products.get(&product_id)?;
                Some(LineItem {
                    id,
                    product_id,
                    product_name: product.name.clone(),
                    product_description: product.description.clone(),
                    quantity,
                    unit_price,
                    subtotal: unit_price * rust_decimal::Decimal::from(quantity),
                })
            })
            .collect();

        Ok(items)
    }

    async fn set_payment_reference(
        &self,
        order_id: OrderId,
        preference_id: &str,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let Some(order) = tables.orders.get_mut(&order_id) else {
            return Ok(false);
        };
        order.payment_id = Some(preference_id.to_string());
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn settle_approved(&self, order_id: OrderId) -> Result<Settlement> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let Some(order) = tables.orders.get_mut(&order_id) else {
            return Ok(Settlement::OrderNotFound);
        };
        if order.payment_status == PaymentStatus::Approved {
            return Ok(Settlement::AlreadyApproved);
        }

        let now = Utc::now();
        order.status = OrderStatus::Paid;
        order.payment_status = PaymentStatus::Approved;
        order.updated_at = now;
        let user_id = order.user_id;

        let lines = tables.order_items.get(&order_id).cloned().unwrap_or_default();
        for &(_, product_id, quantity, _) in &lines {
            if let Some(product) = tables.products.get_mut(&product_id) {
                product.stock -= quantity;
            }
        }

        let before = tables.cart_items.len();
        tables.cart_items.retain(|item| item.user_id != user_id);
        let cleared = (before - tables.cart_items.len()) as u64;

        Ok(Settlement::Applied {
            user_id,
            items_decremented: lines.len(),
            cart_items_cleared: cleared,
        })
    }

    async fn set_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<StatusUpdate> {
        let mut tables = self.tables.write().await;

        let Some(order) = tables.orders.get_mut(&order_id) else {
            return Ok(StatusUpdate::OrderNotFound);
        };
        if order.payment_status == PaymentStatus::Approved {
            return Ok(StatusUpdate::AlreadyApproved);
        }

        order.payment_status = status;
        order.updated_at = Utc::now();
        Ok(StatusUpdate::Applied)
    }

    async fn payment_view(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderPaymentView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id)
            .map(OrderPaymentView::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);
    const ORDER: OrderId = OrderId::new(10);
    const BEANS: ProductId = ProductId::new(100);
    const MUG: ProductId = ProductId::new(101);

    async fn seeded() -> MemoryShopStore {
        let store = MemoryShopStore::new();
        store.insert_user(ALICE, "Alice", "alice@example.com").await;
        store.insert_user(BOB, "Bob", "bob@example.com").await;
        for (id, name, stock) in [(BEANS, "Café de Colombia", 20), (MUG, "Taza", 5)] {
            store
                .insert_product(Product {
                    id,
                    name: name.into(),
                    description: None,
                    stock,
                })
                .await;
        }
        store
            .insert_order(Order {
                id: ORDER,
                user_id: ALICE,
                total: dec!(31.00),
                status: OrderStatus::Pending,
                payment_status: PaymentStatus::Pending,
                payment_id: None,
                shipping_address: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await;
        store.insert_order_item(ORDER, BEANS, 3, dec!(8.50)).await;
        store.insert_order_item(ORDER, MUG, 1, dec!(5.50)).await;
        store.insert_cart_item(ALICE, BEANS, 3).await;
        store.insert_cart_item(ALICE, MUG, 1).await;
        store.insert_cart_item(BOB, MUG, 2).await;
        store
    }

    #[tokio::test]
    async fn test_find_order_checks_owner() {
        let store = seeded().await;
        let found = store.find_order_for_user(ORDER, ALICE).await.unwrap().unwrap();
        assert_eq!(found.payer.email, "alice@example.com");
        assert!(store.find_order_for_user(ORDER, BOB).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_line_items_join_products() {
        let store = seeded().await;
        let items = store.line_items(ORDER).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_name, "Café de Colombia");
        assert_eq!(items[0].subtotal, dec!(25.50));
    }

    #[tokio::test]
    async fn test_settle_approved_applies_once() {
        let store = seeded().await;

        let first = store.settle_approved(ORDER).await.unwrap();
        assert_eq!(
            first,
            Settlement::Applied {
                user_id: ALICE,
                items_decremented: 2,
                cart_items_cleared: 2,
            }
        );
        assert_eq!(store.product(BEANS).await.unwrap().stock, 17);
        assert_eq!(store.product(MUG).await.unwrap().stock, 4);
        assert!(store.cart_items(ALICE).await.is_empty());
        assert_eq!(store.cart_items(BOB).await.len(), 1);

        let order = store.order(ORDER).await.unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_status, PaymentStatus::Approved);

        let replay = store.settle_approved(ORDER).await.unwrap();
        assert_eq!(replay, Settlement::AlreadyApproved);
        assert_eq!(store.product(BEANS).await.unwrap().stock, 17);
    }

    #[tokio::test]
    async fn test_status_update_never_downgrades_approval() {
        let store = seeded().await;

        let update = store
            .set_payment_status(ORDER, PaymentStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(update, StatusUpdate::Applied);
        assert_eq!(
            store.order(ORDER).await.unwrap().payment_status,
            PaymentStatus::Rejected
        );

        store.settle_approved(ORDER).await.unwrap();
        let late = store
            .set_payment_status(ORDER, PaymentStatus::Pending)
            .await
            .unwrap();
        assert_eq!(late, StatusUpdate::AlreadyApproved);
        assert_eq!(
            store.order(ORDER).await.unwrap().payment_status,
            PaymentStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_missing_order() {
        let store = seeded().await;
        let missing = OrderId::new(999);
        assert_eq!(
            store.settle_approved(missing).await.unwrap(),
            Settlement::OrderNotFound
        );
        assert!(!store.set_payment_reference(missing, "pref").await.unwrap());
    }

    #[tokio::test]
    async fn test_payment_view_is_owner_only() {
        let store = seeded().await;
        store.set_payment_reference(ORDER, "pref-1").await.unwrap();

        let view = store.payment_view(ORDER, ALICE).await.unwrap().unwrap();
        assert_eq!(view.payment_id.as_deref(), Some("pref-1"));
        assert!(store.payment_view(ORDER, BOB).await.unwrap().is_none());
    }
}
