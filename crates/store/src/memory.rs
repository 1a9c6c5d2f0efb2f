use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, InventoryId, OrderId};
use domain::{InventoryRecord, Money, Order, ProductId};
use tokio::sync::RwLock;

use crate::{CatalogLookup, InventoryStore, OrderStore, Product, Result, StoreError};

/// In-memory catalog for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub async fn add_product(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    /// Changes the current price of a product. Returns false if it is unknown.
    pub async fn set_price(&self, product_id: &ProductId, unit_price: Money) -> bool {
        match self.products.write().await.get_mut(product_id) {
            Some(product) => {
                product.unit_price = unit_price;
                true
            }
            None => false,
        }
    }

    /// Removes a product from the catalog.
    pub async fn remove_product(&self, product_id: &ProductId) {
        self.products.write().await.remove(product_id);
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(product_id).cloned())
    }
}

/// A stock mutation applied to the in-memory inventory, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOperation {
    Decrement { id: InventoryId, quantity: u32 },
    Increment { id: InventoryId, quantity: u32 },
}

#[derive(Default)]
struct InventoryState {
    records: HashMap<InventoryId, InventoryRecord>,
    failing_increments: HashSet<InventoryId>,
    operations: Vec<StockOperation>,
}

impl InventoryState {
    fn live_record_mut(&mut self, id: InventoryId) -> Result<&mut InventoryRecord> {
        self.records
            .get_mut(&id)
            .filter(|record| !record.is_deleted())
            .ok_or_else(|| StoreError::not_found("inventory", id))
    }
}

/// In-memory inventory store.
///
/// The conditional decrement holds the write lock across the availability
/// check and the update, so it is atomic per record.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    state: Arc<RwLock<InventoryState>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty inventory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record and returns its ID.
    pub async fn insert(&self, record: InventoryRecord) -> InventoryId {
        let id = record.id();
        self.state.write().await.records.insert(id, record);
        id
    }

    /// Returns the current quantity of a record, ignoring soft-deletion.
    pub async fn quantity_of(&self, id: InventoryId) -> Option<u32> {
        self.state
            .read()
            .await
            .records
            .get(&id)
            .map(InventoryRecord::quantity)
    }

    /// Soft-deletes a record.
    pub async fn soft_delete(&self, id: InventoryId) {
        if let Some(record) = self.state.write().await.records.get_mut(&id) {
            record.mark_deleted(Utc::now());
        }
    }

    /// Makes every future increment of `id` fail.
    pub async fn fail_increment_for(&self, id: InventoryId) {
        self.state.write().await.failing_increments.insert(id);
    }

    /// Returns every successful stock mutation, oldest first.
    pub async fn operations(&self) -> Vec<StockOperation> {
        self.state.read().await.operations.clone()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_by_id(&self, id: InventoryId) -> Result<Option<InventoryRecord>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .get(&id)
            .filter(|record| !record.is_deleted())
            .cloned())
    }

    async fn find_by_product(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .find(|record| record.product_id() == product_id && !record.is_deleted())
            .cloned())
    }

    async fn conditional_decrement(
        &self,
        id: InventoryId,
        quantity: u32,
    ) -> Result<InventoryRecord> {
        let mut state = self.state.write().await;
        let record = state.live_record_mut(id)?;
        record.decrement(quantity, Utc::now())?;
        let updated = record.clone();
        state
            .operations
            .push(StockOperation::Decrement { id, quantity });
        Ok(updated)
    }

    async fn increment(&self, id: InventoryId, quantity: u32) -> Result<InventoryRecord> {
        let mut state = self.state.write().await;
        if state.failing_increments.contains(&id) {
            return Err(StoreError::Unavailable(format!(
                "increment rejected for inventory {id}"
            )));
        }
        let record = state.live_record_mut(id)?;
        record.increment(quantity, Utc::now())?;
        let updated = record.clone();
        state
            .operations
            .push(StockOperation::Increment { id, quantity });
        Ok(updated)
    }
}

#[derive(Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_insert: bool,
}

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to reject inserts.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.state.write().await.fail_on_insert = fail;
    }

    /// Returns the number of stored orders, including soft-deleted ones.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Soft-deletes an order.
    pub async fn soft_delete(&self, id: OrderId) {
        if let Some(order) = self.state.write().await.orders.get_mut(&id) {
            order.mark_deleted(Utc::now());
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<Order> {
        let mut state = self.state.write().await;

        if state.fail_on_insert {
            return Err(StoreError::Unavailable("order insert rejected".to_string()));
        }

        let stored = order.with_version(1);
        state.orders.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn update_status(&self, order: &Order) -> Result<Order> {
        let mut state = self.state.write().await;

        let current = state
            .orders
            .get(&order.id())
            .filter(|stored| !stored.is_deleted())
            .ok_or_else(|| StoreError::not_found("order", order.id()))?;

        if current.version() != order.version() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
                actual: current.version(),
            });
        }

        let stored = order.clone().with_version(current.version() + 1);
        state.orders.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .get(&id)
            .filter(|order| !order.is_deleted())
            .cloned())
    }

    async fn list_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| order.customer_id() == customer_id && !order.is_deleted())
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }
}
