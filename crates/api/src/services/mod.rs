//! Transactional order engine.
//!
//! # Services
//!
//! - `stock_ledger` - The only code that mutates product stock
//! - `cart` - Per-user cart lines; adding reserves stock immediately
//! - `orders` - Atomic order + lines + payment creation, order updates
//! - `retry` - Bounded retry on optimistic-concurrency conflicts
//! - `addresses` - Shipping address lookup (external collaborator)
//! - `catalog` - Read-through product cache (external collaborator)
//!
//! Every stock mutation runs inside a [`StoreTx`](crate::db::StoreTx) that
//! first row-locks the product and then applies a version-guarded update.
//! Errors are classified here as [`EngineError`] and propagated unchanged
//! to the HTTP boundary.

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod retry;
pub mod stock_ledger;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

use cartwright_core::{ProductId, QuantityError, StatusTransitionError};

use crate::db::RepositoryError;

pub use addresses::{AddressResolver, PgAddressResolver};
pub use cart::CartService;
pub use catalog::ProductCatalog;
pub use orders::{LineRequest, OrderService};
pub use retry::RetryPolicy;
pub use stock_ledger::StockLedger;

/// Errors produced by the order engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Product or order is absent, or not owned by the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// Shipping address is absent or belongs to another user.
    #[error("address not found")]
    AddressNotFound,

    /// Not enough units left to satisfy the request.
    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: i32,
        available: i32,
    },

    /// A concurrent writer changed the product first. Safe to retry.
    #[error("concurrent update on product {product_id}, retry the request")]
    Conflict { product_id: ProductId },

    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    /// Transaction, commit, or connectivity failure.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl EngineError {
    /// Whether re-running the whole operation from scratch may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<QuantityError> for EngineError {
    fn from(err: QuantityError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StatusTransitionError> for EngineError {
    fn from(err: StatusTransitionError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(
            EngineError::Conflict {
                product_id: ProductId::new(1)
            }
            .is_retryable()
        );
        assert!(
            !EngineError::InsufficientStock {
                product_id: ProductId::new(1),
                name: "Lamp".to_string(),
                requested: 2,
                available: 1,
            }
            .is_retryable()
        );
        assert!(!EngineError::NotFound("product 1".to_string()).is_retryable());
        assert!(!EngineError::Storage(RepositoryError::NotFound).is_retryable());
    }

    #[test]
    fn test_insufficient_stock_names_the_product() {
        let err = EngineError::InsufficientStock {
            product_id: ProductId::new(9),
            name: "Desk Lamp".to_string(),
            requested: 4,
            available: 1,
        };
        assert!(err.to_string().contains("Desk Lamp"));
    }
}
