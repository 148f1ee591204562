//! catfecito HTTP Server
//!
//! Axum-based server for the storefront's payment flow: MercadoPago
//! preferences, payment notifications and order payment status.

mod app;
mod auth;
mod config;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catfecito_core::ShopStore;
use catfecito_db::PgShopStore;
use catfecito_payments::MercadoPagoClient;

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::state::{AppState, Payments};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Database
    let pool = catfecito_db::create_pool(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    tracing::info!("✓ Connected to PostgreSQL");

    if config.run_migrations {
        catfecito_db::migrate(&pool)
            .await
            .context("running migrations")?;
        tracing::info!("✓ Migrations applied");
    }

    let store: Arc<dyn ShopStore> = Arc::new(PgShopStore::new(pool));

    // Initialize payments
    let payments = match config.mercadopago.clone() {
        Some(mp) => {
            let webhook_secret = mp.webhook_secret.clone();
            let client = MercadoPagoClient::new(mp).context("building MercadoPago client")?;
            tracing::info!("✓ MercadoPago configured");
            tracing::info!("  Notifications: {}", config.checkout.notification_url());
            if webhook_secret.is_none() {
                tracing::warn!("⚠ MP_WEBHOOK_SECRET not set - notification signatures not checked");
            }

            Some(Arc::new(Payments::new(
                store.clone(),
                Arc::new(client),
                config.checkout.clone(),
                webhook_secret,
            )))
        }
        None => {
            tracing::warn!("⚠ MercadoPago not configured - payments disabled");
            tracing::warn!("  Set MP_ACCESS_TOKEN in .env");
            None
        }
    };

    // Build application state
    let state = AppState {
        store,
        payments,
        jwt: Arc::new(JwtKeys::new(&config.jwt_secret)),
    };

    let app = app::router(state, &config.static_dir);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("☕ catfecito server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                          - Health check");
    tracing::info!("  POST /api/payments/create-preference  - Start checkout");
    tracing::info!("  POST /api/payments/webhook            - MercadoPago notifications");
    tracing::info!("  GET  /api/payments/status/{{order_id}}  - Order payment status");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
