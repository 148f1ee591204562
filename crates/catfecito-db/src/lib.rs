//! # catfecito-db
//!
//! PostgreSQL implementation of [`ShopStore`].
//!
//! ## Tables
//!
//! - `users` - storefront accounts (payer name and email)
//! - `products` - catalog with stock counts
//! - `orders` - one row per order, carries fulfillment and payment status
//! - `order_items` - order lines with unit price and subtotal
//! - `cart_items` - per-user pending selections
//!
//! Migrations live in `crates/catfecito-db/migrations/` and are embedded
//! into the binary; see [`migrate`].

mod rows;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use catfecito_core::{
    LineItem, OrderId, OrderPaymentView, OrderWithPayer, PaymentStatus, Result, Settlement,
    ShopStore, StatusUpdate, StoreError, UserId,
};

use crate::rows::{LineItemRow, OrderRow, StockLine};

/// Create a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &str) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Run the embedded schema migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// [`ShopStore`] backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgShopStore {
    pool: PgPool,
}

impl PgShopStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn order_exists(&self, order_id: OrderId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
            .bind(order_id.as_i32())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl ShopStore for PgShopStore {
    async fn find_order_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderWithPayer>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.user_id, o.total, o.status, o.payment_status, o.payment_id,
                   o.shipping_address, o.created_at, o.updated_at,
                   u.name AS user_name, u.email AS user_email
            FROM orders o
            INNER JOIN users u ON o.user_id = u.id
            WHERE o.id = $1 AND o.user_id = $2
            ",
        )
        .bind(order_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(OrderRow::into_order_with_payer).transpose()
    }

    async fn line_items(&self, order_id: OrderId) -> Result<Vec<LineItem>> {
        let rows = sqlx::query_as::<_, LineItemRow>(
            r"
            SELECT oi.id, oi.product_id, oi.quantity, oi.price, oi.subtotal,
                   p.name AS product_name, p.description AS product_description
            FROM order_items oi
            INNER JOIN products p ON oi.product_id = p.id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(order_id.as_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(LineItem::from).collect())
    }

    async fn set_payment_reference(
        &self,
        order_id: OrderId,
        preference_id: &str,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE orders SET payment_id = $1, updated_at = NOW() WHERE id = $2")
                .bind(preference_id)
                .bind(order_id.as_i32())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn settle_approved(&self, order_id: OrderId) -> Result<Settlement> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Row lock: a concurrent delivery for the same order blocks here and
        // then sees payment_status = 'approved'.
        let owner = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE orders
            SET status = 'paid', payment_status = 'approved', updated_at = NOW()
            WHERE id = $1 AND payment_status <> 'approved'
            RETURNING user_id
            ",
        )
        .bind(order_id.as_i32())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(user_id) = owner else {
            tx.rollback().await.map_err(db_err)?;
            return if self.order_exists(order_id).await? {
                Ok(Settlement::AlreadyApproved)
            } else {
                Ok(Settlement::OrderNotFound)
            };
        };

        let lines = sqlx::query_as::<_, StockLine>(
            "SELECT product_id, quantity FROM order_items WHERE order_id = $1",
        )
        .bind(order_id.as_i32())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        for line in &lines {
            sqlx::query("UPDATE products SET stock = stock - $1, updated_at = NOW() WHERE id = $2")
                .bind(line.quantity)
                .bind(line.product_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        let cleared = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();

        tx.commit().await.map_err(db_err)?;

        tracing::debug!(
            order_id = %order_id,
            user_id,
            lines = lines.len(),
            cleared,
            "Settled approved payment"
        );

        Ok(Settlement::Applied {
            user_id: UserId::new(user_id),
            items_decremented: lines.len(),
            cart_items_cleared: cleared,
        })
    }

    async fn set_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<StatusUpdate> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET payment_status = $1, updated_at = NOW()
            WHERE id = $2 AND payment_status <> 'approved'
            ",
        )
        .bind(status.as_str())
        .bind(order_id.as_i32())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() > 0 {
            Ok(StatusUpdate::Applied)
        } else if self.order_exists(order_id).await? {
            Ok(StatusUpdate::AlreadyApproved)
        } else {
            Ok(StatusUpdate::OrderNotFound)
        }
    }

    async fn payment_view(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderPaymentView>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.user_id, o.total, o.status, o.payment_status, o.payment_id,
                   o.shipping_address, o.created_at, o.updated_at,
                   NULL::TEXT AS user_name, NULL::TEXT AS user_email
            FROM orders o
            WHERE o.id = $1 AND o.user_id = $2
            ",
        )
        .bind(order_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|r| r.into_order().map(|order| OrderPaymentView::from(&order)))
            .transpose()
    }
}
