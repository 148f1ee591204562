//! API Client

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Checkout link for an order
#[derive(Clone, Debug, Deserialize)]
pub struct PreferenceCreated {
    pub preference_id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
}

impl PreferenceCreated {
    /// Production link, falling back to the sandbox one
    pub fn redirect_url(&self) -> Option<&str> {
        self.init_point
            .as_deref()
            .or(self.sandbox_init_point.as_deref())
    }
}

/// Stored payment fields of an order
#[derive(Clone, Debug, Deserialize)]
pub struct OrderPayment {
    pub id: i32,
    pub total: String,
    pub status: String,
    pub payment_status: String,
    pub payment_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StatusResponse {
    order: OrderPayment,
}

fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into())
}

/// Token saved by the login flow
fn token() -> Option<String> {
    web_sys::window()?
        .local_storage()
        .ok()??
        .get_item("token")
        .ok()?
}

async fn error_message(response: reqwest::Response) -> String {
    let data: serde_json::Value = response.json().await.unwrap_or_default();
    data["error"]
        .as_str()
        .unwrap_or("Request failed")
        .to_string()
}

/// Create a MercadoPago preference for an order
pub async fn create_preference(order_id: i32) -> Result<PreferenceCreated, String> {
    let token = token().ok_or("Iniciá sesión para pagar")?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/payments/create-preference", origin()))
        .bearer_auth(token)
        .json(&serde_json::json!({ "order_id": order_id }))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        response.json().await.map_err(|e| e.to_string())
    } else {
        Err(error_message(response).await)
    }
}

/// Fetch the stored payment status of an order
pub async fn payment_status(order_id: i32) -> Result<OrderPayment, String> {
    let token = token().ok_or("Iniciá sesión para ver tu pedido")?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/payments/status/{order_id}", origin()))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        let data: StatusResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(data.order)
    } else {
        Err(error_message(response).await)
    }
}
