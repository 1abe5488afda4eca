//! Database operations for the Cartwright `PostgreSQL` store.
//!
//! # Schema: `cartwright`
//!
//! ## Tables
//!
//! - `product` - Catalog rows with `stock` and the optimistic `version` stamp
//! - `address` - User shipping addresses (read by the address resolver)
//! - `cart_item` - Cart lines, primary key `(user_id, product_id)`
//! - `customer_order` - Order headers
//! - `order_item` - Order lines with the unit price captured at order time
//! - `payment` - One payment stub per order
//!
//! # Storage seam
//!
//! The engine talks to storage through [`CommerceStore`] and the
//! transaction handle it hands out, [`StoreTx`]. Two implementations exist:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx, row locks with `SELECT ... FOR UPDATE`
//! - [`MemoryStore`] - in-process store for tests and local demos
//!
//! Dropping a [`StoreTx`] without calling [`StoreTx::commit`] rolls it back.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p cartwright-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cartwright_core::{OrderId, ProductId, Quantity, UserId};

use crate::models::{CartLine, NewOrderLine, Order, OrderLine, Page, Payment, Product};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate key).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Read access and transaction entry point for the order engine.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Start a unit of work.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError>;

    /// All cart lines for a user, oldest first.
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Delete every cart line for a user, returning how many were removed.
    async fn delete_cart_lines(&self, user_id: UserId) -> Result<u64, RepositoryError>;

    /// A single product, without locking.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// A page of products ordered by ID.
    async fn products(&self, page: Page) -> Result<Vec<Product>, RepositoryError>;

    /// An order header, only if it belongs to `user_id`.
    async fn order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// The lines of an order, in insertion order.
    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError>;

    /// The payment created with an order.
    async fn payment_for_order(&self, order_id: OrderId)
    -> Result<Option<Payment>, RepositoryError>;

    /// Connectivity check for the readiness endpoint.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Operations that run inside one transaction.
///
/// Row locks taken by `lock_*` are held until `commit` or drop.
#[async_trait]
pub trait StoreTx: Send {
    /// Read a product and lock its row for the rest of the transaction.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Conditionally apply `stock += delta, version += 1`, guarded by
    /// `version = expected_version`. Returns the number of rows affected;
    /// zero means another writer got there first.
    async fn apply_stock_delta(
        &mut self,
        id: ProductId,
        delta: i32,
        expected_version: i64,
    ) -> Result<u64, RepositoryError>;

    /// The cart line for `(user_id, product_id)`, if any.
    async fn find_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Insert a new cart line.
    async fn insert_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError>;

    /// Overwrite the quantity of an existing cart line.
    async fn set_cart_line_quantity(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError>;

    /// Delete a cart line, returning it if it existed.
    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Insert an order header.
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError>;

    /// Insert an order line.
    async fn insert_order_line(&mut self, line: &NewOrderLine)
    -> Result<OrderLine, RepositoryError>;

    /// Insert the payment stub for an order.
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), RepositoryError>;

    /// Read an order header owned by `user_id` and lock it.
    async fn lock_order(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Persist the mutable fields (shipping, status) of an order.
    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError>;

    /// Make every write in this transaction visible.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
