use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use cartwright_core::{OrderId, ProductId, Quantity, UserId};

use crate::db::{CommerceStore, MemoryStore, RepositoryError, StoreTx};
use crate::models::{CartLine, NewOrderLine, Order, OrderLine, Page, Payment, Product};

/// Wraps a [`MemoryStore`] and makes the first `conflicts` conditional stock
/// updates report zero rows affected, as if another writer had won.
#[derive(Debug, Clone)]
pub(crate) struct ContendedStore {
    inner: MemoryStore,
    remaining_conflicts: Arc<AtomicUsize>,
    fail_payments: Arc<AtomicBool>,
    payment_stall: Option<Duration>,
    begins: Arc<AtomicUsize>,
}

impl ContendedStore {
    pub(crate) fn new(inner: MemoryStore, conflicts: usize) -> Self {
        Self {
            inner,
            remaining_conflicts: Arc::new(AtomicUsize::new(conflicts)),
            fail_payments: Arc::new(AtomicBool::new(false)),
            payment_stall: None,
            begins: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every payment insert fail with a storage error.
    pub(crate) fn failing_payments(self) -> Self {
        self.fail_payments.store(true, Ordering::SeqCst);
        self
    }

    /// Make every payment insert wait `stall` first, with its transaction open.
    pub(crate) fn stalling_payments(mut self, stall: Duration) -> Self {
        self.payment_stall = Some(stall);
        self
    }

    /// Number of transactions started so far.
    pub(crate) fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommerceStore for ContendedStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.begin().await?;
        Ok(Box::new(ContendedTx {
            inner,
            remaining_conflicts: Arc::clone(&self.remaining_conflicts),
            fail_payments: self.fail_payments.load(Ordering::SeqCst),
            payment_stall: self.payment_stall,
        }))
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        self.inner.cart_lines(user_id).await
    }

    async fn delete_cart_lines(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        self.inner.delete_cart_lines(user_id).await
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.inner.product(id).await
    }

    async fn products(&self, page: Page) -> Result<Vec<Product>, RepositoryError> {
        self.inner.products(page).await
    }

    async fn order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        self.inner.order(user_id, order_id).await
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        self.inner.order_lines(order_id).await
    }

    async fn payment_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError> {
        self.inner.payment_for_order(order_id).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.ping().await
    }
}

struct ContendedTx {
    inner: Box<dyn StoreTx>,
    remaining_conflicts: Arc<AtomicUsize>,
    fail_payments: bool,
    payment_stall: Option<Duration>,
}

#[async_trait]
impl StoreTx for ContendedTx {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.inner.lock_product(id).await
    }

    async fn apply_stock_delta(
        &mut self,
        id: ProductId,
        delta: i32,
        expected_version: i64,
    ) -> Result<u64, RepositoryError> {
        let lost = self
            .remaining_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Ok(0);
        }
        self.inner.apply_stock_delta(id, delta, expected_version).await
    }

    async fn find_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        self.inner.find_cart_line(user_id, product_id).await
    }

    async fn insert_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        self.inner
            .insert_cart_line(user_id, product_id, quantity)
            .await
    }

    async fn set_cart_line_quantity(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        self.inner
            .set_cart_line_quantity(user_id, product_id, quantity)
            .await
    }

    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        self.inner.delete_cart_line(user_id, product_id).await
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        self.inner.insert_order(order).await
    }

    async fn insert_order_line(
        &mut self,
        line: &NewOrderLine,
    ) -> Result<OrderLine, RepositoryError> {
        self.inner.insert_order_line(line).await
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), RepositoryError> {
        if let Some(stall) = self.payment_stall {
            tokio::time::sleep(stall).await;
        }
        if self.fail_payments {
            return Err(RepositoryError::DataCorruption(
                "payment insert rejected".to_string(),
            ));
        }
        self.inner.insert_payment(payment).await
    }

    async fn lock_order(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        self.inner.lock_order(user_id, order_id).await
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        self.inner.update_order(order).await
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.inner.commit().await
    }
}
