//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (store ping)
//!
//! # Cart (x-user-id required)
//! POST   /api/v1/cart                 - Establish cart
//! GET    /api/v1/cart                 - List cart lines
//! DELETE /api/v1/cart                 - Empty cart (stock is not released)
//! POST   /api/v1/cart/items           - Add item, reserving stock
//! DELETE /api/v1/cart/items/{id}      - Remove item, releasing stock
//!
//! # Orders (x-user-id required)
//! POST   /api/v1/orders               - Create order (single attempt)
//! GET    /api/v1/orders/{id}          - Order with lines and payment
//! PATCH  /api/v1/orders/{id}          - Update shipping fields / status
//! POST   /api/v1/checkout             - Create order, retrying conflicts
//!
//! # Catalog (cached)
//! GET    /api/v1/products             - Product listing (?page=&size=)
//! GET    /api/v1/products/{id}        - Product detail
//! ```

pub mod cart;
pub mod orders;
pub mod products;
pub mod response;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    middleware,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(cart::create).get(cart::show).delete(cart::empty))
        .route("/items", post(cart::add_item))
        .route("/items/{product_id}", delete(cart::remove_item))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/{order_id}", get(orders::show).patch(orders::update))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{product_id}", get(products::show))
}

/// Create the versioned JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .route("/checkout", post(orders::checkout))
        .nest("/products", product_routes())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

/// Build the full application router: health checks, API routes, tracing,
/// request IDs, and the request deadline.
pub fn app(state: AppState) -> Router {
    let timeout = state.config().request_timeout;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &axum::http::Request<_>| {
                            tracing::info_span!(
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = tracing::field::Empty,
                                user_id = tracing::field::Empty,
                                status = tracing::field::Empty,
                                latency_ms = tracing::field::Empty,
                            )
                        })
                        .on_response(
                            |response: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &Span| {
                                span.record("status", response.status().as_u16());
                                span.record(
                                    "latency_ms",
                                    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                                );
                                DefaultOnResponse::default().on_response(response, latency, span);
                            },
                        ),
                )
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    timeout,
                )),
        )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use cartwright_core::{AddressId, Price, ProductId, UserId};

    use super::*;
    use crate::config::{ApiConfig, LogFormat};
    use crate::db::{CommerceStore, MemoryStore};
    use crate::middleware::USER_ID_HEADER;
    use crate::models::ShippingDetails;
    use crate::services::test_support::ContendedStore;

    const USER: &str = "1";

    fn config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/unused"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            request_timeout: Duration::from_secs(5),
            checkout_max_attempts: 3,
            catalog_cache_ttl: Duration::from_secs(60),
            catalog_cache_capacity: 100,
            database_max_connections: 1,
            log_format: LogFormat::Text,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    struct TestApp {
        store: MemoryStore,
        router: Router,
        product: ProductId,
        address: AddressId,
    }

    async fn test_app() -> TestApp {
        let store = MemoryStore::new();
        let product = store
            .insert_product("Lamp", Price::from_cents(1999), 10)
            .await;
        let address = store
            .insert_address(
                UserId::new(1),
                ShippingDetails {
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                    street_address: "12 Analytical Way".to_string(),
                    city: "London".to_string(),
                    state: "LDN".to_string(),
                    country: "GB".to_string(),
                    zip_code: "N1".to_string(),
                    email: "ada@example.com".to_string(),
                },
            )
            .await;
        let state = AppState::new(
            config(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );
        TestApp {
            store,
            router: app(state),
            product: product.id,
            address,
        }
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, _) = send(&app.router, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app.router, "GET", "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let app = test_app().await;
        let (status, body) = send(&app.router, "GET", "/api/v1/cart", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);

        let (status, _) = send(&app.router, "GET", "/api/v1/cart", Some("zero"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cart_flow() {
        let app = test_app().await;
        let item = json!({ "product_id": app.product.as_i32(), "quantity": 2 });

        let (status, body) = send(&app.router, "POST", "/api/v1/cart", Some(USER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);

        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/cart/items",
            Some(USER),
            Some(item.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(
            &app.router,
            "POST",
            "/api/v1/cart/items",
            Some(USER),
            Some(item),
        )
        .await;
        assert_eq!(body["data"]["quantity"], 4);

        let (_, body) = send(&app.router, "GET", "/api/v1/cart", Some(USER), None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let uri = format!("/api/v1/cart/items/{}", app.product);
        let (status, _) = send(&app.router, "DELETE", &uri, Some(USER), None).await;
        assert_eq!(status, StatusCode::OK);
        let stock = app.store.product(app.product).await.unwrap().unwrap().stock;
        assert_eq!(stock, 10);

        let (status, body) = send(&app.router, "DELETE", "/api/v1/cart", Some(USER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["removed"], 0);
    }

    #[tokio::test]
    async fn test_add_item_error_mapping() {
        let app = test_app().await;

        let too_many = json!({ "product_id": app.product.as_i32(), "quantity": 11 });
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/cart/items",
            Some(USER),
            Some(too_many),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["data"]["name"], "Lamp");

        let unknown = json!({ "product_id": 999, "quantity": 1 });
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/cart/items",
            Some(USER),
            Some(unknown),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let malformed = json!({ "product_id": "lamp" });
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/cart/items",
            Some(USER),
            Some(malformed),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_checkout_and_order_lifecycle() {
        let app = test_app().await;
        let request = json!({
            "address_id": app.address.as_i32(),
            "items": [{ "product_id": app.product.as_i32(), "quantity": 3 }],
        });

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/checkout",
            Some(USER),
            Some(request),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["amount"], "59.97");
        let order_id = body["data"]["order_id"].as_str().unwrap().to_string();
        assert!(body["data"]["transaction_id"].is_string());

        let uri = format!("/api/v1/orders/{order_id}");
        let (status, body) = send(&app.router, "GET", &uri, Some(USER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["city"], "London");
        assert_eq!(body["data"]["payment"]["status"], "UNPAID");

        let (status, _) = send(&app.router, "GET", &uri, Some("2"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let patch = json!({ "status": "cancelled", "city": "Paris" });
        let (status, body) = send(&app.router, "PATCH", &uri, Some(USER), Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "cancelled");
        assert_eq!(body["data"]["city"], "Paris");

        let reopen = json!({ "status": "pending" });
        let (status, _) = send(&app.router, "PATCH", &uri, Some(USER), Some(reopen)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_order_with_foreign_address() {
        let app = test_app().await;
        let request = json!({
            "address_id": app.address.as_i32(),
            "items": [{ "product_id": app.product.as_i32(), "quantity": 1 }],
        });

        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/orders",
            Some("2"),
            Some(request),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_deadline_rolls_back_order() {
        let seeded = test_app().await;
        let stalled = ContendedStore::new(seeded.store.clone(), 0)
            .stalling_payments(Duration::from_millis(500));
        let state = AppState::new(
            ApiConfig {
                request_timeout: Duration::from_millis(50),
                ..config()
            },
            Arc::new(stalled),
            Arc::new(seeded.store.clone()),
        );
        let router = app(state);
        let request = json!({
            "address_id": seeded.address.as_i32(),
            "items": [{ "product_id": seeded.product.as_i32(), "quantity": 3 }],
        });

        let (status, _) = send(&router, "POST", "/api/v1/orders", Some(USER), Some(request)).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

        let product = seeded.store.product(seeded.product).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        assert_eq!(product.version, 0);
        assert!(seeded.store.all_orders().await.is_empty());
        assert!(seeded.store.all_payments().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_order_is_rejected() {
        let app = test_app().await;
        let request = json!({ "address_id": app.address.as_i32(), "items": [] });
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/orders",
            Some(USER),
            Some(request),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_catalog_reflects_committed_reservations() {
        let app = test_app().await;
        let uri = format!("/api/v1/products/{}", app.product);

        let (status, body) = send(&app.router, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["stock"], 10);

        let item = json!({ "product_id": app.product.as_i32(), "quantity": 4 });
        send(
            &app.router,
            "POST",
            "/api/v1/cart/items",
            Some(USER),
            Some(item),
        )
        .await;

        let (_, body) = send(&app.router, "GET", &uri, None, None).await;
        assert_eq!(body["data"]["stock"], 6);

        let (_, body) = send(&app.router, "GET", "/api/v1/products?page=1&size=5", None, None).await;
        assert_eq!(body["data"][0]["stock"], 6);

        let (status, _) = send(&app.router, "GET", "/api/v1/products/999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id_and_no_store() {
        let app = test_app().await;
        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/v1/products")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }
}
