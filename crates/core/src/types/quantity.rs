//! Validated unit counts.
//!
//! Stock and quantities are whole units. A [`Quantity`] is always at least 1;
//! a cart line that would drop to zero is deleted instead of stored at zero.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity must be at least 1 (got {0})")]
    NotPositive(i64),
    #[error("quantity {0} exceeds the maximum of {1}")]
    TooLarge(i64, i32),
}

/// A positive number of units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Largest representable quantity (matches the `INTEGER` storage column).
    pub const MAX: i32 = i32::MAX;

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for zero or negative values and
    /// `QuantityError::TooLarge` for values that don't fit the storage column.
    pub fn new(value: impl Into<i64>) -> Result<Self, QuantityError> {
        let value = value.into();
        if value < 1 {
            return Err(QuantityError::NotPositive(value));
        }
        i32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge(value, Self::MAX))
    }

    /// Validate a raw quantity against an explicit upper bound.
    ///
    /// # Errors
    ///
    /// Same as [`Quantity::new`], plus `TooLarge` when `value > max`.
    pub fn bounded(value: impl Into<i64>, max: i32) -> Result<Self, QuantityError> {
        let quantity = Self::new(value)?;
        if quantity.0 > max {
            return Err(QuantityError::TooLarge(i64::from(quantity.0), max));
        }
        Ok(quantity)
    }

    /// The number of units.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Add two quantities, failing on overflow.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooLarge` if the sum exceeds [`Quantity::MAX`].
    pub fn checked_add(self, rhs: Self) -> Result<Self, QuantityError> {
        Self::new(i64::from(self.0) + i64::from(rhs.0))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
