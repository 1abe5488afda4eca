//! Stock ledger: the sole authority for mutating product stock.
//!
//! Every change follows the same discipline inside the caller's transaction:
//!
//! 1. Row-lock the product (`SELECT ... FOR UPDATE`)
//! 2. Validate against the locked snapshot
//! 3. Conditional `UPDATE ... WHERE id = $1 AND version = <observed>`
//!
//! Zero rows affected in step 3 means another writer won the race. The ledger
//! reports that as [`EngineError::Conflict`] and never retries on its own;
//! the enclosing transaction must be abandoned.

use tracing::instrument;

use cartwright_core::{ProductId, Quantity};

use super::EngineError;
use crate::db::StoreTx;
use crate::models::Product;

/// Stateless handle to the ledger operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockLedger;

impl StockLedger {
    /// Debit `quantity` units of `product_id`.
    ///
    /// Returns the product as observed under the lock, before the debit, so
    /// callers can snapshot its name and price.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the product does not exist
    /// - `InsufficientStock` if fewer than `quantity` units remain
    /// - `Conflict` if the version changed between the read and the write
    /// - `Storage` on database failure
    #[instrument(skip(self, tx), fields(product_id = %product_id, quantity = %quantity))]
    pub async fn reserve(
        &self,
        tx: &mut dyn StoreTx,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Product, EngineError> {
        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("product {product_id}")))?;

        if product.stock < quantity.get() {
            tracing::info!(
                available = product.stock,
                "Reservation rejected: insufficient stock"
            );
            return Err(EngineError::InsufficientStock {
                product_id,
                name: product.name,
                requested: quantity.get(),
                available: product.stock,
            });
        }

        self.apply(tx, &product, -quantity.get()).await?;

        tracing::debug!(
            version = product.version + 1,
            remaining = product.stock - quantity.get(),
            "Stock reserved"
        );
        Ok(product)
    }

    /// Credit `quantity` units back to `product_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the product does not exist
    /// - `Conflict` if the version changed between the read and the write
    /// - `Validation` if the restored stock would overflow
    /// - `Storage` on database failure
    #[instrument(skip(self, tx), fields(product_id = %product_id, quantity = %quantity))]
    pub async fn release(
        &self,
        tx: &mut dyn StoreTx,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Product, EngineError> {
        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("product {product_id}")))?;

        if product.stock.checked_add(quantity.get()).is_none() {
            return Err(EngineError::Validation(format!(
                "releasing {quantity} units would overflow stock for {}",
                product.name
            )));
        }

        self.apply(tx, &product, quantity.get()).await?;

        tracing::debug!(version = product.version + 1, "Stock released");
        Ok(product)
    }

    async fn apply(
        &self,
        tx: &mut dyn StoreTx,
        observed: &Product,
        delta: i32,
    ) -> Result<(), EngineError> {
        let affected = tx
            .apply_stock_delta(observed.id, delta, observed.version)
            .await?;

        if affected == 0 {
            tracing::warn!(
                product_id = %observed.id,
                expected_version = observed.version,
                "Stock update lost a race"
            );
            return Err(EngineError::Conflict {
                product_id: observed.id,
            });
        }

        Ok(())
    }
}
