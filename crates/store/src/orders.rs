//! Order store: durable order persistence.

use async_trait::async_trait;
use common::{CustomerId, OrderId};
use domain::Order;

use crate::Result;

/// Durable order persistence.
///
/// Orders carry a version. `insert` stores version 1; every successful
/// `update_status` bumps it by one, and only succeeds if the stored version
/// still matches the version on the order passed in.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order and returns it at version 1.
    async fn insert(&self, order: Order) -> Result<Order>;

    /// Persists the status and update timestamp of `order`.
    ///
    /// Fails with `NotFound` if the order is absent and with
    /// `ConcurrencyConflict` if the stored version differs from
    /// `order.version()`. Returns the stored order at its new version.
    async fn update_status(&self, order: &Order) -> Result<Order>;

    /// Retrieves an order by ID. Soft-deleted orders are not returned.
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a customer's orders, newest first.
    async fn list_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;
}
