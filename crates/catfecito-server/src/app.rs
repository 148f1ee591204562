//! Router assembly

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{create_preference, get_payment_status, health_check, payment_webhook};
use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Payments
        .route("/api/payments/create-preference", post(create_preference))
        .route("/api/payments/webhook", post(payment_webhook))
        .route("/api/payments/status/{order_id}", get(get_payment_status))
        // Static files (WASM frontend)
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use catfecito_core::{
        MemoryShopStore, Order, OrderId, OrderStatus, PaymentStatus, Product, ProductId, UserId,
    };
    use catfecito_payments::{
        CheckoutSettings, MockPaymentProvider, PaymentInfo, ProviderPaymentStatus,
    };

    use crate::auth::{Claims, JwtKeys};
    use crate::state::Payments;

    const SECRET: &str = "test-jwt-secret";
    const ANA: UserId = UserId::new(1);
    const LUIS: UserId = UserId::new(2);
    const ORDER: OrderId = OrderId::new(42);
    const PAID_ORDER: OrderId = OrderId::new(43);
    const BEANS: ProductId = ProductId::new(7);

    struct Harness {
        store: Arc<MemoryShopStore>,
        provider: Arc<MockPaymentProvider>,
        app: Router,
    }

    fn order(id: OrderId, user_id: UserId, payment_status: PaymentStatus) -> Order {
        Order {
            id,
            user_id,
            total: dec!(25.50),
            status: OrderStatus::Pending,
            payment_status,
            payment_id: None,
            shipping_address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn harness(payments_enabled: bool, webhook_secret: Option<&str>) -> Harness {
        let store = Arc::new(MemoryShopStore::new());
        store.insert_user(ANA, "Ana", "ana@example.com").await;
        store.insert_user(LUIS, "Luis", "luis@example.com").await;
        store
            .insert_product(Product {
                id: BEANS,
                name: "Café de Etiopía".into(),
                description: None,
                stock: 10,
            })
            .await;
        store.insert_order(order(ORDER, ANA, PaymentStatus::Pending)).await;
        store.insert_order_item(ORDER, BEANS, 3, dec!(8.50)).await;
        store
            .insert_order(order(PAID_ORDER, ANA, PaymentStatus::Approved))
            .await;
        store.insert_order_item(PAID_ORDER, BEANS, 1, dec!(8.50)).await;
        store.insert_cart_item(ANA, BEANS, 3).await;

        let provider = Arc::new(MockPaymentProvider::new());
        let payments = payments_enabled.then(|| {
            Arc::new(Payments::new(
                store.clone(),
                provider.clone(),
                CheckoutSettings::default(),
                webhook_secret.map(String::from),
            ))
        });

        let state = AppState {
            store: store.clone(),
            payments,
            jwt: Arc::new(JwtKeys::new(SECRET)),
        };

        Harness {
            store,
            provider,
            app: router(state, "does-not-exist"),
        }
    }

    fn bearer(user: UserId) -> String {
        let claims = Claims {
            id: user.as_i32(),
            email: None,
            exp: get_current_timestamp() + 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    fn create_request(user: Option<UserId>, body: Value) -> Request<Body> {
        let mut builder = Request::post("/api/payments/create-preference")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, bearer(user));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn webhook_request(body: Value) -> Request<Body> {
        Request::post("/api/payments/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn approve(provider: &MockPaymentProvider, payment_id: &str, order_id: OrderId) {
        provider
            .insert_payment(PaymentInfo {
                id: payment_id.into(),
                status: ProviderPaymentStatus::Approved,
                status_detail: Some("accredited".into()),
                external_reference: Some(order_id.to_string()),
                transaction_amount: Some(dec!(25.50)),
            })
            .await;
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(false, None).await;
        let (status, body) = send(&h.app, Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["payments_configured"], false);
    }

    #[tokio::test]
    async fn test_create_preference() {
        let h = harness(true, None).await;
        let (status, body) = send(&h.app, create_request(Some(ANA), json!({ "order_id": 42 }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["preference_id"], "pref-1");
        assert_eq!(body["order_id"], 42);
        assert!(body["init_point"].as_str().unwrap().contains("pref-1"));

        let stored = h.store.order(ORDER).await.unwrap();
        assert_eq!(stored.payment_id.as_deref(), Some("pref-1"));
        assert_eq!(h.provider.preference_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_preference_accepts_string_id() {
        let h = harness(true, None).await;
        let (status, body) =
            send(&h.app, create_request(Some(ANA), json!({ "order_id": "42" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order_id"], 42);
    }

    #[tokio::test]
    async fn test_create_preference_rejections() {
        let h = harness(true, None).await;

        let (status, body) = send(&h.app, create_request(Some(ANA), json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_ORDER_ID");

        let (status, body) = send(&h.app, create_request(Some(LUIS), json!({ "order_id": 42 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "ORDER_NOT_FOUND");

        let (status, body) = send(&h.app, create_request(Some(ANA), json!({ "order_id": 43 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ORDER_ALREADY_PAID");

        let (status, body) = send(&h.app, create_request(None, json!({ "order_id": 42 }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        assert!(h.provider.preference_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_preference_provider_failure() {
        let h = harness(true, None).await;
        h.provider.fail_preferences(true);

        let (status, body) = send(&h.app, create_request(Some(ANA), json!({ "order_id": 42 }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "PAYMENT_PROVIDER_ERROR");
        assert!(h.store.order(ORDER).await.unwrap().payment_id.is_none());
    }

    #[tokio::test]
    async fn test_webhook_settles_approved_payment() {
        let h = harness(true, None).await;
        approve(&h.provider, "9001", ORDER).await;

        let notification = json!({ "type": "payment", "data": { "id": "9001" } });
        let (status, body) = send(&h.app, webhook_request(notification.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let stored = h.store.order(ORDER).await.unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Approved);
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(h.store.product(BEANS).await.unwrap().stock, 7);
        assert!(h.store.cart_items(ANA).await.is_empty());

        // Redelivery leaves stock alone
        let (status, _) = send(&h.app, webhook_request(notification)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.store.product(BEANS).await.unwrap().stock, 7);
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_failures() {
        let h = harness(true, None).await;

        // Unknown payment id: provider lookup fails
        let (status, _) = send(
            &h.app,
            webhook_request(json!({ "type": "payment", "data": { "id": "404" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Garbage body
        let request = Request::post("/api/payments/webhook")
            .body(Body::from("not json"))
            .unwrap();
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        assert_eq!(
            h.store.order(ORDER).await.unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_webhook_ipn_query() {
        let h = harness(true, None).await;
        approve(&h.provider, "77", ORDER).await;

        let request = Request::post("/api/payments/webhook?topic=payment&id=77")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            h.store.order(ORDER).await.unwrap().payment_status,
            PaymentStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_webhook_signature_required_when_configured() {
        let h = harness(true, Some("whsec")).await;
        approve(&h.provider, "9001", ORDER).await;
        let notification = json!({ "type": "payment", "data": { "id": "9001" } });

        let (status, body) = send(&h.app, webhook_request(notification.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_SIGNATURE");

        let request = Request::post("/api/payments/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-signature", "ts=1704908010,v1=deadbeef")
            .header("x-request-id", "req-1")
            .body(Body::from(notification.to_string()))
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert_eq!(
            h.store.order(ORDER).await.unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_payment_status_owner_only() {
        let h = harness(true, None).await;

        let request = |user: UserId| {
            Request::get("/api/payments/status/42")
                .header(header::AUTHORIZATION, bearer(user))
                .body(Body::empty())
                .unwrap()
        };

        let (status, body) = send(&h.app, request(ANA)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["order"]["id"], 42);
        assert_eq!(body["order"]["payment_status"], "pending");

        let (status, body) = send(&h.app, request(LUIS)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "ORDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_payment_status_rejects_non_numeric_id() {
        let h = harness(true, None).await;
        let request = Request::get("/api/payments/status/abc")
            .header(header::AUTHORIZATION, bearer(ANA))
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_ORDER_ID");
    }

    #[tokio::test]
    async fn test_webhook_ignores_path_like_payment_id() {
        let h = harness(true, None).await;
        approve(&h.provider, "../../users/me", ORDER).await;

        let (status, body) = send(
            &h.app,
            webhook_request(json!({ "type": "payment", "data": { "id": "../../users/me" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(
            h.store.order(ORDER).await.unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_payments_disabled() {
        let h = harness(false, None).await;

        let (status, body) = send(&h.app, create_request(Some(ANA), json!({ "order_id": 42 }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "PAYMENTS_DISABLED");

        let (status, _) = send(&h.app, webhook_request(json!({ "type": "payment" }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // Status reads the store directly
        let request = Request::get("/api/payments/status/42")
            .header(header::AUTHORIZATION, bearer(ANA))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
    }
}
