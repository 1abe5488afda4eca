//! `PostgreSQL` implementation of the storage seam.
//!
//! Queries are checked at runtime (`sqlx::query_as::<_, Row>`) so the crate
//! builds without a live database. Row locks use `SELECT ... FOR UPDATE`;
//! stock changes use a conditional `UPDATE ... WHERE version = $n` and report
//! rows affected back to the stock ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use cartwright_core::{
    OrderId, OrderLineId, OrderStatus, PaymentStatus, Price, ProductId, Quantity, TransactionId,
    UserId,
};

use super::{CommerceStore, RepositoryError, StoreTx};
use crate::models::{
    CartLine, NewOrderLine, Order, OrderLine, Page, Payment, Product, ShippingDetails,
};

// =============================================================================
// Internal Row Types
// =============================================================================

const PRODUCT_COLUMNS: &str = "id, name, price, stock, version, created_at, updated_at";
const CART_COLUMNS: &str = "user_id, product_id, quantity, created_at, updated_at";
const ORDER_COLUMNS: &str = "order_id, user_id, first_name, last_name, street_address, city, \
                             state, country, zip_code, email, status, created_at";

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
    stock: i32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for cart line queries.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: stored_quantity(row.quantity)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for order header queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: OrderId,
    user_id: UserId,
    first_name: String,
    last_name: String,
    street_address: String,
    city: String,
    state: String,
    country: String,
    zip_code: String,
    email: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            order_id: row.order_id,
            user_id: row.user_id,
            shipping: ShippingDetails {
                first_name: row.first_name,
                last_name: row.last_name,
                street_address: row.street_address,
                city: row.city,
                state: row.state,
                country: row.country,
                zip_code: row.zip_code,
                email: row.email,
            },
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Internal row type for order line queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    cost: Price,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: stored_quantity(row.quantity)?,
            cost: row.cost,
        })
    }
}

/// Internal row type for payment queries.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    transaction_id: TransactionId,
    order_id: OrderId,
    amount: Price,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            transaction_id: row.transaction_id,
            order_id: row.order_id,
            amount: row.amount,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

fn stored_quantity(raw: i32) -> Result<Quantity, RepositoryError> {
    Quantity::new(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid quantity in database: {e}")))
}

fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL`-backed [`CommerceStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommerceStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cartwright.cart_item
             WHERE user_id = $1
             ORDER BY created_at ASC, product_id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn delete_cart_lines(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cartwright.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM cartwright.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn products(&self, page: Page) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM cartwright.product
             ORDER BY id ASC
             LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM cartwright.customer_order
             WHERE order_id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            "SELECT id, order_id, product_id, quantity, cost
             FROM cartwright.order_item
             WHERE order_id = $1
             ORDER BY id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderLine::try_from).collect()
    }

    async fn payment_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT transaction_id, order_id, amount, status, created_at
             FROM cartwright.payment
             WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Payment::from))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A `PostgreSQL` transaction. Rolls back on drop unless committed.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM cartwright.product WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn apply_stock_delta(
        &mut self,
        id: ProductId,
        delta: i32,
        expected_version: i64,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE cartwright.product
             SET stock = stock + $2, version = version + 1, updated_at = NOW()
             WHERE id = $1 AND version = $3",
        )
        .bind(id)
        .bind(delta)
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cartwright.cart_item
             WHERE user_id = $1 AND product_id = $2
             FOR UPDATE"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(CartLine::try_from).transpose()
    }

    async fn insert_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(&format!(
            "INSERT INTO cartwright.cart_item (user_id, product_id, quantity)
             VALUES ($1, $2, $3)
             RETURNING {CART_COLUMNS}"
        ))
        .bind(user_id)
        .bind(product_id)
        .bind(quantity.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "cart line"))?;

        row.try_into()
    }

    async fn set_cart_line_quantity(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(&format!(
            "UPDATE cartwright.cart_item
             SET quantity = $3, updated_at = NOW()
             WHERE user_id = $1 AND product_id = $2
             RETURNING {CART_COLUMNS}"
        ))
        .bind(user_id)
        .bind(product_id)
        .bind(quantity.get())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(&format!(
            "DELETE FROM cartwright.cart_item
             WHERE user_id = $1 AND product_id = $2
             RETURNING {CART_COLUMNS}"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(CartLine::try_from).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let s = &order.shipping;
        sqlx::query(
            "INSERT INTO cartwright.customer_order (
                 order_id, user_id, first_name, last_name, street_address,
                 city, state, country, zip_code, email, status, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(order.order_id)
        .bind(order.user_id)
        .bind(&s.first_name)
        .bind(&s.last_name)
        .bind(&s.street_address)
        .bind(&s.city)
        .bind(&s.state)
        .bind(&s.country)
        .bind(&s.zip_code)
        .bind(&s.email)
        .bind(order.status)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "order"))?;

        Ok(())
    }

    async fn insert_order_line(
        &mut self,
        line: &NewOrderLine,
    ) -> Result<OrderLine, RepositoryError> {
        let row = sqlx::query_as::<_, OrderLineRow>(
            "INSERT INTO cartwright.order_item (order_id, product_id, quantity, cost)
             VALUES ($1, $2, $3, $4)
             RETURNING id, order_id, product_id, quantity, cost",
        )
        .bind(line.order_id)
        .bind(line.product_id)
        .bind(line.quantity.get())
        .bind(line.cost)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cartwright.payment (transaction_id, order_id, amount, status, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(payment.transaction_id)
        .bind(payment.order_id)
        .bind(payment.amount)
        .bind(payment.status)
        .bind(payment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "payment"))?;

        Ok(())
    }

    async fn lock_order(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM cartwright.customer_order
             WHERE order_id = $1 AND user_id = $2
             FOR UPDATE"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Order::from))
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let s = &order.shipping;
        let result = sqlx::query(
            "UPDATE cartwright.customer_order
             SET first_name = $3, last_name = $4, street_address = $5, city = $6,
                 state = $7, country = $8, zip_code = $9, email = $10, status = $11
             WHERE order_id = $1 AND user_id = $2",
        )
        .bind(order.order_id)
        .bind(order.user_id)
        .bind(&s.first_name)
        .bind(&s.last_name)
        .bind(&s.street_address)
        .bind(&s.city)
        .bind(&s.state)
        .bind(&s.country)
        .bind(&s.zip_code)
        .bind(&s.email)
        .bind(order.status)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
