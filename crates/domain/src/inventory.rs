//! Inventory records and derived stock status.

use chrono::{DateTime, Utc};
use common::InventoryId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::ProductId;

/// Errors raised by inventory quantity changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Requested more units than are available.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Incrementing would overflow the stock counter.
    #[error("Stock overflow for product {product_id}: {available} + {added}")]
    QuantityOverflow {
        product_id: ProductId,
        available: u32,
        added: u32,
    },
}

/// Stock level classification, derived from quantity and the low-water-mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Classifies a quantity against a low-stock threshold.
    pub fn for_quantity(quantity: u32, low_stock_threshold: u32) -> Self {
        if quantity == 0 {
            StockStatus::OutOfStock
        } else if quantity <= low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-product stock count.
///
/// `status` is never set directly: every quantity change goes through
/// [`InventoryRecord::decrement`] or [`InventoryRecord::increment`], which
/// recompute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRecord {
    id: InventoryId,
    product_id: ProductId,
    quantity: u32,
    low_stock_threshold: u32,
    status: StockStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// Creates a new record for a product.
    pub fn new(
        product_id: impl Into<ProductId>,
        quantity: u32,
        low_stock_threshold: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InventoryId::new(),
            product_id: product_id.into(),
            quantity,
            low_stock_threshold,
            status: StockStatus::for_quantity(quantity, low_stock_threshold),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Rebuilds a record from stored columns, deriving the status.
    pub fn restore(
        id: InventoryId,
        product_id: ProductId,
        quantity: u32,
        low_stock_threshold: u32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            product_id,
            quantity,
            low_stock_threshold,
            status: StockStatus::for_quantity(quantity, low_stock_threshold),
            created_at,
            updated_at,
            deleted_at,
        }
    }

    pub fn id(&self) -> InventoryId {
        self.id
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Returns the available quantity.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if `quantity` units can be taken right now.
    pub fn can_reserve(&self, quantity: u32) -> bool {
        quantity <= self.quantity
    }

    /// Takes `quantity` units if available, otherwise leaves the record unchanged.
    pub fn decrement(&mut self, quantity: u32, at: DateTime<Utc>) -> Result<(), InventoryError> {
        let remaining =
            self.quantity
                .checked_sub(quantity)
                .ok_or_else(|| InventoryError::InsufficientStock {
                    product_id: self.product_id.clone(),
                    requested: quantity,
                    available: self.quantity,
                })?;
        self.set_quantity(remaining, at);
        Ok(())
    }

    /// Returns `quantity` units to stock.
    pub fn increment(&mut self, quantity: u32, at: DateTime<Utc>) -> Result<(), InventoryError> {
        let total =
            self.quantity
                .checked_add(quantity)
                .ok_or_else(|| InventoryError::QuantityOverflow {
                    product_id: self.product_id.clone(),
                    available: self.quantity,
                    added: quantity,
                })?;
        self.set_quantity(total, at);
        Ok(())
    }

    /// Marks the record as soft-deleted.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
        self.updated_at = at;
    }

    fn set_quantity(&mut self, quantity: u32, at: DateTime<Utc>) {
        self.quantity = quantity;
        self.status = StockStatus::for_quantity(quantity, self.low_stock_threshold);
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_thresholds() {
        assert_eq!(StockStatus::for_quantity(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::for_quantity(1, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::for_quantity(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::for_quantity(6, 5), StockStatus::InStock);
        assert_eq!(StockStatus::for_quantity(0, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::for_quantity(1, 0), StockStatus::InStock);
    }

    #[test]
    fn test_new_record_derives_status() {
        let record = InventoryRecord::new("SKU-001", 3, 5, Utc::now());
        assert_eq!(record.status(), StockStatus::LowStock);
    }

    #[test]
    fn test_decrement_recomputes_status() {
        let mut record = InventoryRecord::new("SKU-001", 10, 5, Utc::now());

        record.decrement(5, Utc::now()).unwrap();
        assert_eq!(record.quantity(), 5);
        assert_eq!(record.status(), StockStatus::LowStock);

        record.decrement(5, Utc::now()).unwrap();
        assert_eq!(record.quantity(), 0);
        assert_eq!(record.status(), StockStatus::OutOfStock);
    }

    #[test]
    fn test_decrement_beyond_available_is_rejected() {
        let mut record = InventoryRecord::new("SKU-001", 2, 1, Utc::now());
        let before = record.clone();

        let err = record.decrement(3, Utc::now()).unwrap_err();

        assert_eq!(
            err,
            InventoryError::InsufficientStock {
                product_id: ProductId::new("SKU-001"),
                requested: 3,
                available: 2,
            }
        );
        assert_eq!(record, before);
    }

    #[test]
    fn test_increment_restores_status() {
        let mut record = InventoryRecord::new("SKU-001", 0, 2, Utc::now());
        record.increment(10, Utc::now()).unwrap();
        assert_eq!(record.quantity(), 10);
        assert_eq!(record.status(), StockStatus::InStock);
    }

    #[test]
    fn test_increment_overflow_is_rejected() {
        let mut record = InventoryRecord::new("SKU-001", u32::MAX, 2, Utc::now());
        assert!(matches!(
            record.increment(1, Utc::now()),
            Err(InventoryError::QuantityOverflow { .. })
        ));
        assert_eq!(record.quantity(), u32::MAX);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&StockStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"out_of_stock\"");
    }
}
