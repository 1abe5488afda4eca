//! Product catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartwright_core::{Price, ProductId};

/// A sellable product with its stock counter.
///
/// `stock` and `version` change only through the stock ledger; every
/// successful change bumps `version` by exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name, also used in stock error messages.
    pub name: String,
    /// Current unit price.
    pub price: Price,
    /// Units available for sale. Never negative.
    pub stock: i32,
    /// Optimistic concurrency stamp.
    pub version: i64,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Pagination window for catalog listings (1-based page).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    pub page: u32,
    pub size: u32,
}

impl Page {
    /// Largest page size served.
    pub const MAX_SIZE: u32 = 100;

    /// Build a page, clamping out-of-range values.
    #[must_use]
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    /// Row offset of the first item.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.size as i64
    }

    /// Number of rows to fetch.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.size as i64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamps() {
        let page = Page::new(0, 500);
        assert_eq!(page.page, 1);
        assert_eq!(page.size, Page::MAX_SIZE);
    }

    #[test]
    fn test_page_offset() {
        let page = Page::new(3, 10);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.limit(), 10);
    }
}
