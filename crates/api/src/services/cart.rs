//! Cart aggregator.
//!
//! Adding to the cart reserves stock immediately. Repeated adds for the same
//! product merge into one line. Conflicts are surfaced to the caller as
//! retryable errors; this service does not retry on its own.

use std::sync::Arc;

use tracing::instrument;

use cartwright_core::{ProductId, Quantity, UserId};

use super::{EngineError, ProductCatalog, StockLedger};
use crate::db::CommerceStore;
use crate::models::CartLine;

/// Per-user cart operations.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CommerceStore>,
    ledger: StockLedger,
    catalog: ProductCatalog,
}

impl CartService {
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>, catalog: ProductCatalog) -> Self {
        Self {
            store,
            ledger: StockLedger,
            catalog,
        }
    }

    /// Establish that `user_id` has a cart. Carts have no row of their own,
    /// so this writes nothing.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn create_cart(&self, user_id: UserId) {
        tracing::debug!("Cart ready");
    }

    /// All lines in the user's cart, oldest first. Empty if there are none.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the lookup fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, EngineError> {
        Ok(self.store.cart_lines(user_id).await?)
    }

    /// Delete every line in the user's cart.
    ///
    /// Reserved stock is NOT returned to the products; use
    /// [`CartService::remove_item`] to release a line's units.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the delete fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn empty_cart(&self, user_id: UserId) -> Result<u64, EngineError> {
        let removed = self.store.delete_cart_lines(user_id).await?;
        tracing::info!(removed, "Cart emptied without releasing reserved stock");
        Ok(removed)
    }

    /// Reserve `quantity` units and add them to the user's cart line for
    /// `product_id`, creating the line if needed.
    ///
    /// # Errors
    ///
    /// - `Validation` if `quantity` is not a positive integer or the merged
    ///   quantity overflows
    /// - `NotFound` if the product does not exist
    /// - `InsufficientStock` if the product cannot cover `quantity`
    /// - `Conflict` if a concurrent writer changed the product
    /// - `Storage` on database failure
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartLine, EngineError> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = self.store.begin().await?;

        self.ledger
            .reserve(tx.as_mut(), product_id, quantity)
            .await?;

        let line = match tx.find_cart_line(user_id, product_id).await? {
            None => {
                tx.insert_cart_line(user_id, product_id, quantity)
                    .await?
            }
            Some(existing) => {
                let merged = existing.quantity.checked_add(quantity).map_err(|e| {
                    EngineError::Validation(format!("cart quantity for product {product_id}: {e}"))
                })?;
                tx.set_cart_line_quantity(user_id, product_id, merged)
                    .await?
            }
        };

        tx.commit().await?;
        self.catalog.invalidate_products(&[product_id]).await;

        tracing::info!(quantity = %line.quantity, "Cart line updated");
        Ok(line)
    }

    /// Delete the user's line for `product_id` and return its units to stock.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the cart has no line for the product
    /// - `Conflict` if a concurrent writer changed the product
    /// - `Storage` on database failure
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartLine, EngineError> {
        let mut tx = self.store.begin().await?;

        // Product row first, same lock order as add_item.
        tx.lock_product(product_id).await?;

        let line = tx
            .delete_cart_line(user_id, product_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("cart line for product {product_id}")))?;

        self.ledger
            .release(tx.as_mut(), product_id, line.quantity)
            .await?;

        tx.commit().await?;
        self.catalog.invalidate_products(&[product_id]).await;

        tracing::info!(released = %line.quantity, "Cart line removed");
        Ok(line)
    }
}
