//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{CommerceStore, PgStore};
use crate::services::{
    AddressResolver, CartService, OrderService, PgAddressResolver, ProductCatalog, RetryPolicy,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Services hold their own
/// handle to the injected store; nothing is read from global state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn CommerceStore>,
    catalog: ProductCatalog,
    cart: CartService,
    orders: OrderService,
}

impl AppState {
    /// Wire services over an arbitrary store and address resolver.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn CommerceStore>,
        addresses: Arc<dyn AddressResolver>,
    ) -> Self {
        let catalog = ProductCatalog::new(
            Arc::clone(&store),
            config.catalog_cache_capacity,
            config.catalog_cache_ttl,
        );
        let cart = CartService::new(Arc::clone(&store), catalog.clone());
        let orders = OrderService::new(
            Arc::clone(&store),
            addresses,
            catalog.clone(),
            RetryPolicy::new(config.checkout_max_attempts),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                catalog,
                cart,
                orders,
            }),
        }
    }

    /// Wire services over `PostgreSQL`.
    #[must_use]
    pub fn postgres(config: ApiConfig, pool: PgPool) -> Self {
        let addresses = Arc::new(PgAddressResolver::new(pool.clone()));
        Self::new(config, Arc::new(PgStore::new(pool)), addresses)
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn store(&self) -> &dyn CommerceStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the product catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}
