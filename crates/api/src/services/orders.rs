//! Order builder.
//!
//! Turns a list of requested lines plus an address reference into an order
//! header, its lines, and an unpaid payment stub, all in one transaction.
//! Stock for every line is debited through the [`StockLedger`] inside that
//! same transaction, so a failure at any line rolls back every write,
//! including earlier debits.
//!
//! Lines are coalesced by product and processed in ascending product ID
//! order, giving every concurrent checkout the same lock acquisition order.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use cartwright_core::{
    AddressId, OrderId, OrderStatus, PaymentStatus, Price, ProductId, Quantity, TransactionId,
    UserId,
};

use super::{AddressResolver, EngineError, ProductCatalog, RetryPolicy, StockLedger};
use crate::db::CommerceStore;
use crate::models::{NewOrderLine, Order, OrderDetails, OrderPatch, Payment, PlacedOrder};

/// Largest quantity accepted for one product in a request, after duplicate
/// lines are merged.
pub const MAX_LINE_QUANTITY: i32 = 100;

/// One requested `(product, quantity)` pair, as received from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Validate requested lines and merge duplicates. Both each entry and the
/// merged total per product must fit in `1..=MAX_LINE_QUANTITY`.
///
/// The returned map iterates in ascending product ID order.
fn coalesce(lines: &[LineRequest]) -> Result<BTreeMap<ProductId, Quantity>, EngineError> {
    if lines.is_empty() {
        return Err(EngineError::Validation(
            "order must contain at least one line".to_string(),
        ));
    }

    let mut merged: BTreeMap<ProductId, Quantity> = BTreeMap::new();
    for line in lines {
        let quantity = Quantity::bounded(line.quantity, MAX_LINE_QUANTITY).map_err(|e| {
            EngineError::Validation(format!("product {}: {e}", line.product_id))
        })?;
        let total = match merged.get(&line.product_id) {
            Some(existing) => {
                Quantity::bounded(existing.get() + quantity.get(), MAX_LINE_QUANTITY).map_err(
                    |e| EngineError::Validation(format!("product {} in total: {e}", line.product_id)),
                )?
            }
            None => quantity,
        };
        merged.insert(line.product_id, total);
    }

    Ok(merged)
}

/// Order creation, lookup, and updates.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn CommerceStore>,
    addresses: Arc<dyn AddressResolver>,
    ledger: StockLedger,
    catalog: ProductCatalog,
    retry: RetryPolicy,
}

impl OrderService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CommerceStore>,
        addresses: Arc<dyn AddressResolver>,
        catalog: ProductCatalog,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            addresses,
            ledger: StockLedger,
            catalog,
            retry,
        }
    }

    /// Create an order in a single attempt.
    ///
    /// # Errors
    ///
    /// - `Validation` if `lines` is empty or a quantity is outside 1..=100
    /// - `AddressNotFound` if the address is not the caller's
    /// - `NotFound` / `InsufficientStock` for the first failing line
    /// - `Conflict` if a concurrent writer changed one of the products
    /// - `Storage` on database failure
    #[instrument(skip(self, lines), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        address_id: AddressId,
        lines: &[LineRequest],
    ) -> Result<PlacedOrder, EngineError> {
        let lines = coalesce(lines)?;
        self.place(user_id, address_id, &lines, 1).await
    }

    /// Create an order, re-running the whole workflow on `Conflict` up to the
    /// configured attempt budget.
    ///
    /// # Errors
    ///
    /// Same as [`OrderService::create_order`]; `Conflict` only once every
    /// attempt has lost its race.
    #[instrument(skip(self, lines), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        address_id: AddressId,
        lines: &[LineRequest],
    ) -> Result<PlacedOrder, EngineError> {
        let lines = coalesce(lines)?;
        let lines = &lines;
        self.retry
            .run(move |attempt| self.place(user_id, address_id, lines, attempt))
            .await
    }

    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn place(
        &self,
        user_id: UserId,
        address_id: AddressId,
        lines: &BTreeMap<ProductId, Quantity>,
        attempt: u32,
    ) -> Result<PlacedOrder, EngineError> {
        let shipping = self
            .addresses
            .resolve(user_id, address_id)
            .await?
            .ok_or(EngineError::AddressNotFound)?;

        let mut tx = self.store.begin().await?;

        let order = Order {
            order_id: OrderId::generate(),
            user_id,
            shipping,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        tx.insert_order(&order).await?;

        let mut total = Price::ZERO;
        for (&product_id, &quantity) in lines {
            let product = self
                .ledger
                .reserve(tx.as_mut(), product_id, quantity)
                .await?;

            let line = NewOrderLine {
                order_id: order.order_id,
                product_id,
                quantity,
                cost: product.price,
            };
            tx.insert_order_line(&line).await?;
            total = total + product.price.times(quantity);
        }

        let payment = Payment {
            transaction_id: TransactionId::generate(),
            order_id: order.order_id,
            amount: total,
            status: PaymentStatus::Unpaid,
            created_at: Utc::now(),
        };
        tx.insert_payment(&payment).await?;

        tx.commit().await?;

        let touched: Vec<ProductId> = lines.keys().copied().collect();
        self.catalog.invalidate_products(&touched).await;

        tracing::info!(
            order_id = %order.order_id,
            transaction_id = %payment.transaction_id,
            amount = %total,
            "Order committed"
        );

        Ok(PlacedOrder {
            order_id: order.order_id,
            transaction_id: payment.transaction_id,
            amount: total,
        })
    }

    /// Fetch an order with its lines and payment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist or is not the caller's.
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetails, EngineError> {
        let order = self
            .store
            .order(user_id, order_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;

        let lines = self.store.order_lines(order_id).await?;
        let payment = self.store.payment_for_order(order_id).await?;

        Ok(OrderDetails {
            order,
            lines,
            payment,
        })
    }

    /// Apply whitelisted shipping and status changes to the caller's order.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist or is not the caller's
    /// - `Validation` for blank fields or a disallowed status change
    /// - `Storage` on database failure
    #[instrument(skip(self, patch), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn update_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        patch: OrderPatch,
    ) -> Result<Order, EngineError> {
        if patch.has_blank_field() {
            return Err(EngineError::Validation(
                "shipping fields must not be blank".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;

        let mut order = tx
            .lock_order(user_id, order_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;

        patch.apply(&mut order)?;
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!(status = %order.status, "Order updated");
        Ok(order)
    }
}
