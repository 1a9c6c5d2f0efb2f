//! Shared types for the order fulfillment backend.

mod types;

pub use types::{CustomerId, IdParseError, InventoryId, OrderId};
