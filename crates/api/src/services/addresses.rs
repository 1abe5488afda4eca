//! Shipping address lookup.
//!
//! Addresses are managed elsewhere; the order engine only reads them.

use async_trait::async_trait;
use sqlx::PgPool;

use cartwright_core::{AddressId, UserId};

use crate::db::RepositoryError;
use crate::models::ShippingDetails;

/// Supplies shipping fields for an address owned by a user.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Look up `address_id`. Returns `None` if it does not exist or belongs
    /// to a different user.
    async fn resolve(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<ShippingDetails>, RepositoryError>;
}

/// Resolves addresses from the `cartwright.address` table.
#[derive(Debug, Clone)]
pub struct PgAddressResolver {
    pool: PgPool,
}

impl PgAddressResolver {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    first_name: String,
    last_name: String,
    street_address: String,
    city: String,
    state: String,
    country: String,
    zip_code: String,
    email: String,
}

impl From<AddressRow> for ShippingDetails {
    fn from(row: AddressRow) -> Self {
        Self {
            first_name: row.first_name,
            last_name: row.last_name,
            street_address: row.street_address,
            city: row.city,
            state: row.state,
            country: row.country,
            zip_code: row.zip_code,
            email: row.email,
        }
    }
}

#[async_trait]
impl AddressResolver for PgAddressResolver {
    async fn resolve(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<ShippingDetails>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            "SELECT first_name, last_name, street_address, city, state, country, zip_code, email
             FROM cartwright.address
             WHERE id = $1 AND user_id = $2",
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ShippingDetails::from))
    }
}
