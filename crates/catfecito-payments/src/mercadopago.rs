//! MercadoPago REST Client
//!
//! Implements [`PaymentProvider`] over the Checkout Pro HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{PaymentError, Result};
use crate::provider::{PaymentInfo, PaymentProvider, Preference, PreferenceRequest};

const DEFAULT_API_BASE: &str = "https://api.mercadopago.com";

/// MercadoPago client configuration
#[derive(Clone, Debug)]
pub struct MercadoPagoConfig {
    /// Private access token (`APP_USR-...` or `TEST-...`)
    pub access_token: String,

    /// API root, overridable for tests
    pub api_base: String,

    /// Secret used to sign webhook notifications; verification is skipped
    /// when unset
    pub webhook_secret: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MercadoPagoConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_base: DEFAULT_API_BASE.into(),
            webhook_secret: None,
            timeout_secs: 30,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("MP_ACCESS_TOKEN")
            .map_err(|_| PaymentError::Config("MP_ACCESS_TOKEN not set".into()))?;
        let api_base = std::env::var("MP_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.into());
        let webhook_secret = std::env::var("MP_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            access_token,
            api_base,
            webhook_secret,
            ..Self::new("")
        })
    }
}

#[derive(Deserialize)]
struct PreferenceResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    init_point: Option<String>,
    #[serde(default)]
    sandbox_init_point: Option<String>,
}

/// MercadoPago API client
pub struct MercadoPagoClient {
    http: reqwest::Client,
    config: MercadoPagoConfig,
}

impl MercadoPagoClient {
    /// Create a new client
    pub fn new(config: MercadoPagoConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(MercadoPagoConfig::from_env()?)
    }

    /// Get the webhook secret, if configured
    pub fn webhook_secret(&self) -> Option<&str> {
        self.config.webhook_secret.as_deref()
    }

    /// API URL with each segment percent-encoded onto the base path
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.config.api_base)
            .map_err(|e| PaymentError::Config(format!("invalid MP_API_BASE: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| PaymentError::Config("MP_API_BASE cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turn a non-2xx response into a provider error carrying the body
    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(PaymentError::Provider(format!("{status}: {body}")))
    }
}

#[async_trait]
impl PaymentProvider for MercadoPagoClient {
    async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference> {
        tracing::debug!(
            external_reference = %request.external_reference,
            items = request.items.len(),
            "Creating MercadoPago preference"
        );

        let response = self
            .http
            .post(self.url(&["checkout", "preferences"])?)
            .bearer_auth(&self.config.access_token)
            .json(request)
            .send()
            .await?;

        let body: PreferenceResponse = Self::error_for_status(response).await?.json().await?;

        let id = body
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::Provider("No preference id returned".into()))?;

        Ok(Preference {
            id,
            init_point: body.init_point,
            sandbox_init_point: body.sandbox_init_point,
        })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo> {
        let response = self
            .http
            .get(self.url(&["v1", "payments", payment_id])?)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;

        let payment = Self::error_for_status(response).await?.json().await?;
        Ok(payment)
    }

    fn name(&self) -> &str {
        "MercadoPago"
    }
}
