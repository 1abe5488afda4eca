//! Integration tests for Cartwright.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory engine tests
//! cargo test -p cartwright-integration-tests
//!
//! # PostgreSQL tests (needs a disposable database)
//! CARTWRIGHT_TEST_DATABASE_URL=postgres://localhost/cartwright_test \
//!     cargo test -p cartwright-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `concurrency` - Many writers against one product through the engine
//! - `checkout_flow` - Cart and order workflows end to end
//! - `postgres_store` - The same guarantees against a real database

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use cartwright_api::db::{CommerceStore, MemoryStore, PgStore};
use cartwright_api::models::ShippingDetails;
use cartwright_api::services::{
    AddressResolver, CartService, OrderService, PgAddressResolver, ProductCatalog, RetryPolicy,
};

/// Environment variable naming the disposable test database.
pub const TEST_DATABASE_URL_VAR: &str = "CARTWRIGHT_TEST_DATABASE_URL";

/// Engine services wired over one store.
#[derive(Clone)]
pub struct Engine {
    pub cart: CartService,
    pub orders: OrderService,
    pub catalog: ProductCatalog,
}

impl Engine {
    /// Wire the services the way the API does.
    #[must_use]
    pub fn new(
        store: Arc<dyn CommerceStore>,
        addresses: Arc<dyn AddressResolver>,
        checkout_attempts: u32,
    ) -> Self {
        let catalog = ProductCatalog::new(Arc::clone(&store), 1_000, Duration::from_secs(60));
        let cart = CartService::new(Arc::clone(&store), catalog.clone());
        let orders = OrderService::new(
            store,
            addresses,
            catalog.clone(),
            RetryPolicy::new(checkout_attempts).without_backoff(),
        );

        Self {
            cart,
            orders,
            catalog,
        }
    }

    /// Engine over an in-memory store.
    #[must_use]
    pub fn memory(store: &MemoryStore) -> Self {
        Self::new(Arc::new(store.clone()), Arc::new(store.clone()), 3)
    }

    /// Engine over `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self::new(
            Arc::new(PgStore::new(pool.clone())),
            Arc::new(PgAddressResolver::new(pool.clone())),
            3,
        )
    }
}

/// A complete set of shipping fields for `first_name`.
#[must_use]
pub fn shipping(first_name: &str) -> ShippingDetails {
    ShippingDetails {
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        street_address: "1 Integration Row".to_string(),
        city: "Springfield".to_string(),
        state: "OR".to_string(),
        country: "US".to_string(),
        zip_code: "97477".to_string(),
        email: format!("{}@example.com", first_name.to_lowercase()),
    }
}

/// Connect to the test database and apply migrations.
///
/// # Panics
///
/// Panics if the variable is unset or the database cannot be prepared; the
/// tests that call this are `#[ignore]`d by default.
pub async fn test_pool() -> PgPool {
    dotenvy::dotenv().ok();

    let url = std::env::var(TEST_DATABASE_URL_VAR)
        .map(SecretString::from)
        .unwrap_or_else(|_| panic!("{TEST_DATABASE_URL_VAR} must be set for PostgreSQL tests"));

    let pool = PgPool::connect(url.expose_secret())
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../api/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}
