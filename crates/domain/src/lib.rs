//! Domain layer for the order fulfillment backend.
//!
//! This crate provides the entities the fulfillment core works on:
//! - Order aggregate with its line items and price snapshot
//! - Order status state machine
//! - Inventory records with derived stock status

pub mod inventory;
pub mod order;

pub use common::{CustomerId, IdParseError, InventoryId, OrderId};
pub use inventory::{InventoryError, InventoryRecord, StockStatus};
pub use order::{Money, Order, OrderError, OrderItem, OrderStatus, ProductId, can_transition};
