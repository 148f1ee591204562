//! Mock Payment Provider
//!
//! For tests and local development without MercadoPago credentials.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{PaymentError, Result};
use crate::provider::{PaymentInfo, PaymentProvider, Preference, PreferenceRequest};

/// Mock provider with scripted payments
#[derive(Default)]
pub struct MockPaymentProvider {
    preferences: Mutex<Vec<PreferenceRequest>>,
    payments: Mutex<HashMap<String, PaymentInfo>>,
    counter: AtomicU32,
    fail_preferences: AtomicBool,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a payment returned by `get_payment`
    pub async fn insert_payment(&self, payment: PaymentInfo) {
        self.payments.lock().await.insert(payment.id.clone(), payment);
    }

    /// Make subsequent preference calls fail
    pub fn fail_preferences(&self, fail: bool) {
        self.fail_preferences.store(fail, Ordering::SeqCst);
    }

    /// Preference requests received so far
    pub async fn preference_requests(&self) -> Vec<PreferenceRequest> {
        self.preferences.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference> {
        if self.fail_preferences.load(Ordering::SeqCst) {
            return Err(PaymentError::Provider("mock provider unavailable".into()));
        }

        self.preferences.lock().await.push(request.clone());
        let id = format!("pref-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);

        Ok(Preference {
            init_point: Some(format!("https://mock.mercadopago/checkout?pref_id={id}")),
            sandbox_init_point: Some(format!(
                "https://sandbox.mock.mercadopago/checkout?pref_id={id}"
            )),
            id,
        })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo> {
        self.payments
            .lock()
            .await
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::Provider(format!("404 Not Found: payment {payment_id}")))
    }

    fn name(&self) -> &str {
        "MockPaymentProvider"
    }
}
