//! Seed the database with demo catalog rows and shipping addresses.
//!
//! Products are matched by name, so running the command twice leaves one row
//! per demo product and resets its stock. Addresses are only inserted when the
//! user has none yet.

use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use cartwright_core::Price;

use super::{DATABASE_URL_VAR, connect, database_url};

/// Demo catalog: name and price in cents.
const DEMO_PRODUCTS: &[(&str, i64)] = &[
    ("Walnut Desk Lamp", 4_999),
    ("Linen Throw Pillow", 2_450),
    ("Ceramic Pour-Over Set", 3_800),
    ("Wool Felt Coasters (4)", 1_299),
    ("Brass Bottle Opener", 999),
];

/// Options for the seed command.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// Starting stock for every demo product.
    pub stock: i32,
    /// Owner of the demo shipping addresses.
    pub user_id: i32,
    /// Whether to insert addresses at all.
    pub addresses: bool,
}

/// Rows written by a seed run.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedSummary {
    pub products: usize,
    pub addresses: usize,
}

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Rejected command-line option.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Insert demo data.
///
/// # Errors
///
/// Returns `SeedError` for invalid options, a missing database URL, or any
/// failed statement. All writes happen in one transaction.
pub async fn run(options: &SeedOptions) -> Result<SeedSummary, SeedError> {
    validate(options)?;

    let database_url = database_url().ok_or(SeedError::MissingEnvVar(DATABASE_URL_VAR))?;
    let pool = connect(&database_url).await?;
    info!("Connected to database");

    seed(&pool, options).await
}

fn validate(options: &SeedOptions) -> Result<(), SeedError> {
    if options.stock < 0 {
        return Err(SeedError::InvalidOption(format!(
            "stock must not be negative (got {})",
            options.stock
        )));
    }
    if options.user_id <= 0 {
        return Err(SeedError::InvalidOption(format!(
            "user id must be positive (got {})",
            options.user_id
        )));
    }
    Ok(())
}

async fn seed(pool: &PgPool, options: &SeedOptions) -> Result<SeedSummary, SeedError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for &(name, cents) in DEMO_PRODUCTS {
        let price = Price::from_cents(cents);
        let updated = sqlx::query(
            "UPDATE cartwright.product
             SET price = $2, stock = $3, version = version + 1, updated_at = NOW()
             WHERE name = $1",
        )
        .bind(name)
        .bind(price.amount())
        .bind(options.stock)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            sqlx::query("INSERT INTO cartwright.product (name, price, stock) VALUES ($1, $2, $3)")
                .bind(name)
                .bind(price.amount())
                .bind(options.stock)
                .execute(&mut *tx)
                .await?;
        }

        info!(product = %name, %price, stock = options.stock, "Seeded product");
        summary.products += 1;
    }

    if options.addresses {
        summary.addresses = seed_addresses(&mut tx, options.user_id).await?;
    }

    tx.commit().await?;
    Ok(summary)
}

async fn seed_addresses(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: i32,
) -> Result<usize, SeedError> {
    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM cartwright.address WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;

    if existing > 0 {
        info!(user_id, existing, "User already has addresses, skipping");
        return Ok(0);
    }

    let addresses = [
        ("Ada", "Lovelace", "12 Analytical Way", "London", "LDN", "GB", "N1 9GU"),
        ("Grace", "Hopper", "700 Compiler Ct", "Arlington", "VA", "US", "22201"),
    ];

    for (first, last, street, city, state, country, zip) in addresses {
        let email = format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase());
        sqlx::query(
            "INSERT INTO cartwright.address
                (user_id, first_name, last_name, street_address, city, state, country, zip_code, email)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user_id)
        .bind(first)
        .bind(last)
        .bind(street)
        .bind(city)
        .bind(state)
        .bind(country)
        .bind(zip)
        .bind(&email)
        .execute(&mut **tx)
        .await?;
    }

    info!(user_id, count = addresses.len(), "Seeded addresses");
    Ok(addresses.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(stock: i32, user_id: i32) -> SeedOptions {
        SeedOptions {
            stock,
            user_id,
            addresses: true,
        }
    }

    #[test]
    fn test_validate_options() {
        assert!(validate(&options(10, 1)).is_ok());
        assert!(validate(&options(0, 1)).is_ok());
        assert!(matches!(
            validate(&options(-1, 1)),
            Err(SeedError::InvalidOption(_))
        ));
        assert!(matches!(
            validate(&options(10, 0)),
            Err(SeedError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_demo_prices_are_positive() {
        for (name, cents) in DEMO_PRODUCTS {
            assert!(*cents > 0, "{name} has no price");
        }
    }
}
