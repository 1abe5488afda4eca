//! Read-through product catalog cache.
//!
//! Serves product detail and list lookups for display. The order engine never
//! trusts these values: price and stock for a reservation are always re-read
//! under the row lock. After any committed stock change the engine calls
//! [`ProductCatalog::invalidate_products`] so listings do not drift far.
//!
//! A miss reads the store and then fills the cache. If an invalidation lands
//! between that read and the fill, the read may predate the commit, so the
//! fill is skipped. Each invalidation bumps a generation counter under a write
//! lock; fills compare against the generation taken before the read.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use cartwright_core::ProductId;

use super::EngineError;
use crate::db::CommerceStore;
use crate::models::{Page, Product};

const LIST_KEY_PREFIX: &str = "product:list:";

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
}

fn detail_key(id: ProductId) -> String {
    format!("product:detail:{id}")
}

fn list_key(page: Page) -> String {
    format!("{LIST_KEY_PREFIX}{}:{}", page.page, page.size)
}

/// Product lookups backed by a `moka` cache.
#[derive(Clone)]
pub struct ProductCatalog {
    inner: Arc<ProductCatalogInner>,
}

struct ProductCatalogInner {
    store: Arc<dyn CommerceStore>,
    cache: Cache<String, CacheValue>,
    generation: RwLock<u64>,
}

impl ProductCatalog {
    /// Create a catalog over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>, capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();

        Self {
            inner: Arc::new(ProductCatalogInner {
                store,
                cache,
                generation: RwLock::new(0),
            }),
        }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist, `Storage` if the
    /// lookup fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, EngineError> {
        let cache_key = detail_key(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let generation = self.generation().await;
        let product = self
            .inner
            .store
            .product(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("product {id}")))?;

        self.fill(
            cache_key,
            CacheValue::Product(Box::new(product.clone())),
            generation,
        )
        .await;

        Ok(product)
    }

    /// Get a page of products ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the lookup fails.
    #[instrument(skip(self), fields(page = page.page, size = page.size))]
    pub async fn products(&self, page: Page) -> Result<Vec<Product>, EngineError> {
        let cache_key = list_key(page);

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products.as_ref().clone());
        }

        let generation = self.generation().await;
        let products = self.inner.store.products(page).await?;

        self.fill(
            cache_key,
            CacheValue::Products(Arc::new(products.clone())),
            generation,
        )
        .await;

        Ok(products)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    async fn generation(&self) -> u64 {
        *self.inner.generation.read().await
    }

    /// Insert `value` unless an invalidation happened since `generation`.
    async fn fill(&self, key: String, value: CacheValue, generation: u64) {
        let current = self.inner.generation.read().await;
        if *current != generation {
            debug!(key = %key, "Skipping cache fill after invalidation");
            return;
        }
        self.inner.cache.insert(key, value).await;
    }

    /// Drop the detail entries for `ids` and every cached listing.
    pub async fn invalidate_products(&self, ids: &[ProductId]) {
        let mut generation = self.inner.generation.write().await;
        *generation += 1;

        for id in ids {
            self.inner.cache.invalidate(&detail_key(*id)).await;
        }

        if let Err(e) = self
            .inner
            .cache
            .invalidate_entries_if(|key, _| key.starts_with(LIST_KEY_PREFIX))
        {
            tracing::warn!(error = %e, "Failed to invalidate product listings, clearing cache");
            self.inner.cache.invalidate_all();
            self.inner.cache.run_pending_tasks().await;
        }
    }
}
