//! Cart line type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartwright_core::{ProductId, Quantity, UserId};

/// One product in a user's cart, keyed by `(user_id, product_id)`.
///
/// The quantity is always at least one; a line that would reach zero is
/// deleted instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
