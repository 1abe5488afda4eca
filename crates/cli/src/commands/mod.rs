//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Environment variable holding the Cartwright database URL.
pub const DATABASE_URL_VAR: &str = "CARTWRIGHT_DATABASE_URL";

/// Read the database URL, falling back to `DATABASE_URL`.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Open a small pool for one-shot commands.
pub async fn connect(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    use secrecy::ExposeSecret;

    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.expose_secret())
        .await
}
