//! Server Configuration
//!
//! Everything is read from the environment (after `.env` is loaded).

use catfecito_payments::{CheckoutSettings, MercadoPagoConfig, PaymentError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,

    /// HS256 secret shared with the auth service issuing user tokens
    pub jwt_secret: String,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,

    /// Directory holding the compiled web frontend
    pub static_dir: String,

    pub checkout: CheckoutSettings,

    /// `None` disables the payment endpoints
    pub mercadopago: Option<MercadoPagoConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let run_migrations = match std::env::var("RUN_MIGRATIONS") {
            Err(_) => true,
            Ok(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "RUN_MIGRATIONS",
                value,
            })?,
        };

        let mercadopago = match MercadoPagoConfig::from_env() {
            Ok(config) => Some(config),
            Err(PaymentError::Config(reason)) => {
                tracing::debug!(%reason, "MercadoPago not configured");
                None
            }
            Err(_) => None,
        };

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            run_migrations,
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".into()),
            checkout: CheckoutSettings::from_env(),
            mercadopago,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
