//! Inventory store: keyed stock records.

use async_trait::async_trait;
use common::InventoryId;
use domain::{InventoryRecord, ProductId};

use crate::Result;

/// Stock records keyed by [`InventoryId`].
///
/// `conditional_decrement` is the only synchronization point between
/// concurrent orders: implementations must check availability and apply the
/// decrement as one atomic step per record. Soft-deleted records behave as
/// if they did not exist.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Retrieves a record by ID.
    async fn get_by_id(&self, id: InventoryId) -> Result<Option<InventoryRecord>>;

    /// Retrieves the record stocking a product.
    async fn find_by_product(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>>;

    /// Takes `quantity` units if at least that many are available.
    ///
    /// Fails with `StoreError::Inventory(InsufficientStock)` when short, or
    /// `StoreError::NotFound` when the record is absent. Returns the updated
    /// record.
    async fn conditional_decrement(&self, id: InventoryId, quantity: u32)
    -> Result<InventoryRecord>;

    /// Returns `quantity` units to stock. Returns the updated record.
    async fn increment(&self, id: InventoryId, quantity: u32) -> Result<InventoryRecord>;
}
