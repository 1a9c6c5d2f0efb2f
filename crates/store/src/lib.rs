//! Collaborator stores for the order fulfillment core.
//!
//! Each store is a trait with an in-memory implementation (tests, local
//! runs) and a PostgreSQL implementation.

pub mod catalog;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod orders;
pub mod postgres;

pub use catalog::{CatalogLookup, Product};
pub use error::{Result, StoreError};
pub use inventory::InventoryStore;
pub use memory::{InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore, StockOperation};
pub use orders::OrderStore;
pub use postgres::{PostgresCatalog, PostgresInventoryStore, PostgresOrderStore, run_migrations};
