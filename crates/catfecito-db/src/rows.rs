//! Row types returned by queries and their mapping onto the domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use catfecito_core::{
    LineItem, Order, OrderId, OrderStatus, OrderWithPayer, Payer, PaymentStatus, ProductId,
    Result, StoreError, UserId,
};

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i32,
    pub user_id: i32,
    pub total: Decimal,
    pub status: String,
    pub payment_status: String,
    pub payment_id: Option<String>,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

impl OrderRow {
    pub fn into_order(self) -> Result<Order> {
        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            total: self.total,
            status: OrderStatus::parse(&self.status)?,
            payment_status: PaymentStatus::parse(&self.payment_status)?,
            payment_id: self.payment_id,
            shipping_address: self.shipping_address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub fn into_order_with_payer(mut self) -> Result<OrderWithPayer> {
        let (Some(name), Some(email)) = (self.user_name.take(), self.user_email.take()) else {
            return Err(StoreError::DataCorruption(format!(
                "order {} has no owner name or email",
                self.id
            )));
        };

        Ok(OrderWithPayer {
            order: self.into_order()?,
            payer: Payer { name, email },
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct LineItemRow {
    pub id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
    pub product_name: String,
    pub product_description: Option<String>,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            id: row.id,
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            product_description: row.product_description,
            quantity: row.quantity,
            unit_price: row.price,
            subtotal: row.subtotal,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct StockLine {
    pub product_id: i32,
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(status: &str, payment_status: &str) -> OrderRow {
        OrderRow {
            id: 5,
            user_id: 9,
            total: dec!(12.50),
            status: status.into(),
            payment_status: payment_status.into(),
            payment_id: Some("pref-1".into()),
            shipping_address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user_name: Some("Ana".into()),
            user_email: Some("ana@example.com".into()),
        }
    }

    #[test]
    fn test_order_row_maps_statuses() {
        let with_payer = row("paid", "approved").into_order_with_payer().unwrap();
        assert_eq!(with_payer.order.id, OrderId::new(5));
        assert_eq!(with_payer.order.status, OrderStatus::Paid);
        assert_eq!(with_payer.order.payment_status, PaymentStatus::Approved);
        assert_eq!(with_payer.payer.email, "ana@example.com");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(matches!(
            row("lost", "pending").into_order(),
            Err(StoreError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_missing_payer_is_corruption() {
        let mut r = row("pending", "pending");
        r.user_email = None;
        assert!(r.into_order_with_payer().is_err());
    }
}
