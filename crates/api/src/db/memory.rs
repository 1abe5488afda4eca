//! In-process implementation of the storage seam.
//!
//! Used by unit tests, the integration-test crate, and local demos without a
//! database. A transaction takes the store-wide lock and works on a staged
//! copy of the state; `commit` swaps the copy in, dropping the transaction
//! discards it. Transactions are therefore fully serialized, which is a
//! stricter guarantee than the row locks `PgStore` relies on.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use cartwright_core::{AddressId, OrderId, OrderLineId, Price, ProductId, Quantity, UserId};

use super::{CommerceStore, RepositoryError, StoreTx};
use crate::models::{
    CartLine, NewOrderLine, Order, OrderLine, Page, Payment, Product, ShippingDetails,
};
use crate::services::addresses::AddressResolver;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    addresses: HashMap<AddressId, (UserId, ShippingDetails)>,
    cart: BTreeMap<(UserId, ProductId), CartLine>,
    orders: HashMap<OrderId, Order>,
    order_lines: Vec<OrderLine>,
    payments: HashMap<OrderId, Payment>,
    next_product_id: i32,
    next_address_id: i32,
    next_order_line_id: i32,
}

/// In-memory [`CommerceStore`]. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product with version 0 and return it.
    pub async fn insert_product(&self, name: &str, price: Price, stock: i32) -> Product {
        let mut state = self.state.lock().await;
        state.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_product_id),
            name: name.to_string(),
            price,
            stock,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        product
    }

    /// Register a shipping address for `user_id`.
    pub async fn insert_address(&self, user_id: UserId, details: ShippingDetails) -> AddressId {
        let mut state = self.state.lock().await;
        state.next_address_id += 1;
        let id = AddressId::new(state.next_address_id);
        state.addresses.insert(id, (user_id, details));
        id
    }

    /// Every order header, in no particular order.
    pub async fn all_orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.values().cloned().collect()
    }

    /// Every payment, in no particular order.
    pub async fn all_payments(&self) -> Vec<Payment> {
        self.state.lock().await.payments.values().cloned().collect()
    }

    /// Total number of stored order lines.
    pub async fn order_line_count(&self) -> usize {
        self.state.lock().await.order_lines.len()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = self.state.lock().await;
        let mut lines: Vec<CartLine> = state
            .cart
            .values()
            .filter(|line| line.user_id == user_id)
            .cloned()
            .collect();
        lines.sort_by_key(|line| (line.created_at, line.product_id));
        Ok(lines)
    }

    async fn delete_cart_lines(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().await;
        let before = state.cart.len();
        state.cart.retain(|(owner, _), _| *owner != user_id);
        Ok((before - state.cart.len()) as u64)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn products(&self, page: Page) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().await;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(0);
        Ok(state
            .products
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .get(&order_id)
            .filter(|order| order.user_id == user_id)
            .cloned())
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .order_lines
            .iter()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn payment_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.state.lock().await.payments.get(&order_id).cloned())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl AddressResolver for MemoryStore {
    async fn resolve(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<ShippingDetails>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .addresses
            .get(&address_id)
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, details)| details.clone()))
    }
}

/// A staged copy of the store, published on commit.
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn apply_stock_delta(
        &mut self,
        id: ProductId,
        delta: i32,
        expected_version: i64,
    ) -> Result<u64, RepositoryError> {
        let Some(product) = self.staged.products.get_mut(&id) else {
            return Ok(0);
        };
        if product.version != expected_version {
            return Ok(0);
        }
        let stock = product
            .stock
            .checked_add(delta)
            .filter(|s| *s >= 0)
            .ok_or_else(|| {
                RepositoryError::Conflict(format!("stock for product {id} would become invalid"))
            })?;
        product.stock = stock;
        product.version += 1;
        product.updated_at = Utc::now();
        Ok(1)
    }

    async fn find_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        Ok(self.staged.cart.get(&(user_id, product_id)).cloned())
    }

    async fn insert_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        if !self.staged.products.contains_key(&product_id) {
            return Err(RepositoryError::Conflict(format!(
                "product {product_id} does not exist"
            )));
        }
        let key = (user_id, product_id);
        if self.staged.cart.contains_key(&key) {
            return Err(RepositoryError::Conflict("cart line already exists".to_string()));
        }
        let now = Utc::now();
        let line = CartLine {
            user_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        };
        self.staged.cart.insert(key, line.clone());
        Ok(line)
    }

    async fn set_cart_line_quantity(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let line = self
            .staged
            .cart
            .get_mut(&(user_id, product_id))
            .ok_or(RepositoryError::NotFound)?;
        line.quantity = quantity;
        line.updated_at = Utc::now();
        Ok(line.clone())
    }

    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        Ok(self.staged.cart.remove(&(user_id, product_id)))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        if self.staged.orders.contains_key(&order.order_id) {
            return Err(RepositoryError::Conflict("order already exists".to_string()));
        }
        self.staged.orders.insert(order.order_id, order.clone());
        Ok(())
    }

    async fn insert_order_line(
        &mut self,
        line: &NewOrderLine,
    ) -> Result<OrderLine, RepositoryError> {
        if !self.staged.orders.contains_key(&line.order_id) {
            return Err(RepositoryError::Conflict(format!(
                "order {} does not exist",
                line.order_id
            )));
        }
        self.staged.next_order_line_id += 1;
        let stored = OrderLine {
            id: OrderLineId::new(self.staged.next_order_line_id),
            order_id: line.order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            cost: line.cost,
        };
        self.staged.order_lines.push(stored.clone());
        Ok(stored)
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), RepositoryError> {
        if self.staged.payments.contains_key(&payment.order_id) {
            return Err(RepositoryError::Conflict("payment already exists".to_string()));
        }
        self.staged.payments.insert(payment.order_id, payment.clone());
        Ok(())
    }

    async fn lock_order(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .staged
            .orders
            .get(&order_id)
            .filter(|order| order.user_id == user_id)
            .cloned())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let slot = self
            .staged
            .orders
            .get_mut(&order.order_id)
            .filter(|existing| existing.user_id == order.user_id)
            .ok_or(RepositoryError::NotFound)?;
        slot.shipping = order.shipping.clone();
        slot.status = order.status;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
