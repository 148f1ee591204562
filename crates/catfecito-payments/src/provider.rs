//! Payment Provider Strategy
//!
//! The hosted payment processor is reached through [`PaymentProvider`] so the
//! checkout and webhook flows run unchanged against MercadoPago or the mock.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catfecito_core::{OrderId, UserId};

use crate::error::Result;

/// Payment processor client trait (Strategy pattern)
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a checkout preference the buyer is redirected to
    async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference>;

    /// Look up a payment by the id received in a notification
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo>;

    /// Provider name
    fn name(&self) -> &str;
}

/// One purchasable line of a preference
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub quantity: i32,

    /// Sent as a JSON number; the provider does not accept strings here
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,

    pub currency_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencePayer {
    pub name: String,
    pub email: String,
}

/// Echoed back on payments for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceMetadata {
    pub order_id: OrderId,
    pub user_id: UserId,
}

/// Where the provider sends the buyer after checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

/// Body of a preference creation call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub payer: PreferencePayer,

    /// Order id, echoed back on every payment made against the preference
    pub external_reference: String,

    pub notification_url: String,
    pub statement_descriptor: String,
    pub metadata: PreferenceMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_urls: Option<BackUrls>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_return: Option<String>,
}

/// A created preference
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,

    /// Production checkout link
    pub init_point: Option<String>,

    /// Test-account checkout link
    pub sandbox_init_point: Option<String>,
}

impl Preference {
    /// Link the buyer should be redirected to
    pub fn redirect_url(&self) -> Option<&str> {
        self.init_point
            .as_deref()
            .or(self.sandbox_init_point.as_deref())
    }
}

/// Payment status as reported by the provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderPaymentStatus {
    Approved,
    Rejected,
    Pending,

    /// `in_process`, `refunded`, `cancelled`, ... (not acted upon)
    Other(String),
}

impl From<String> for ProviderPaymentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "pending" => Self::Pending,
            _ => Self::Other(s),
        }
    }
}

impl From<ProviderPaymentStatus> for String {
    fn from(status: ProviderPaymentStatus) -> Self {
        match status {
            ProviderPaymentStatus::Approved => "approved".into(),
            ProviderPaymentStatus::Rejected => "rejected".into(),
            ProviderPaymentStatus::Pending => "pending".into(),
            ProviderPaymentStatus::Other(s) => s,
        }
    }
}

/// Payment details fetched after a notification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfo {
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,

    pub status: ProviderPaymentStatus,

    #[serde(default)]
    pub status_detail: Option<String>,

    /// The order id given when the preference was created
    #[serde(default, deserialize_with = "de::opt_string_or_number")]
    pub external_reference: Option<String>,

    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub transaction_amount: Option<Decimal>,
}

pub(crate) mod de {
    //! Provider ids arrive as numbers in some payloads and strings in others.

    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    fn value_to_string(value: Value) -> Option<String> {
        match value {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        value_to_string(Value::deserialize(d)?)
            .ok_or_else(|| D::Error::custom("expected a string or number id"))
    }

    pub fn opt_string_or_number<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(value_to_string(Value::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_info_accepts_numeric_ids() {
        let info: PaymentInfo = serde_json::from_value(serde_json::json!({
            "id": 1_234_567_890_u64,
            "status": "approved",
            "status_detail": "accredited",
            "external_reference": "42",
            "transaction_amount": 1500.5,
        }))
        .unwrap();

        assert_eq!(info.id, "1234567890");
        assert_eq!(info.status, ProviderPaymentStatus::Approved);
        assert_eq!(info.external_reference.as_deref(), Some("42"));
        assert_eq!(info.transaction_amount, Some(dec!(1500.5)));
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let info: PaymentInfo = serde_json::from_value(serde_json::json!({
            "id": "9",
            "status": "in_process",
            "external_reference": null,
        }))
        .unwrap();

        assert_eq!(info.status, ProviderPaymentStatus::Other("in_process".into()));
        assert!(info.external_reference.is_none());
    }

    #[test]
    fn test_unit_price_serializes_as_number() {
        let item = PreferenceItem {
            id: "1".into(),
            title: "Café".into(),
            description: "Tostado medio".into(),
            quantity: 2,
            unit_price: dec!(8.5),
            currency_id: "ARS".into(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json["unit_price"].is_f64());
    }

    #[test]
    fn test_redirect_url_prefers_production_link() {
        let mut pref = Preference {
            id: "p".into(),
            init_point: Some("https://mp/init".into()),
            sandbox_init_point: Some("https://mp/sandbox".into()),
        };
        assert_eq!(pref.redirect_url(), Some("https://mp/init"));
        pref.init_point = None;
        assert_eq!(pref.redirect_url(), Some("https://mp/sandbox"));
    }
}
