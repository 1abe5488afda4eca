//! Status enums for orders and payments.
//!
//! Both are small state machines with terminal states:
//!
//! ```text
//! Order:    pending -> paid | cancelled
//! Payment:  unpaid  -> paid | failed
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot change status from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cartwright.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Committed, awaiting payment.
    #[default]
    Pending,
    /// Payment received. Terminal.
    Paid,
    /// Abandoned or revoked. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Database and wire name of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    /// Validate a change to `next`. Re-asserting the current status is allowed.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` when leaving a terminal state or moving
    /// back to `pending`.
    pub const fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        match (self, next) {
            (a, b) if a as u8 == b as u8 => Ok(next),
            (Self::Pending, Self::Paid | Self::Cancelled) => Ok(next),
            _ => Err(StatusTransitionError {
                from: self.as_str(),
                to: next.as_str(),
            }),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment record status.
///
/// Payments are created `Unpaid` with the order and are never reconciled by
/// this service; `Paid`/`Failed` are written by whatever settles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cartwright.payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Database and wire name of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
