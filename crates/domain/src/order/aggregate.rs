//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderItem, OrderStatus};

/// Order aggregate root.
///
/// An order owns its items exclusively. The total amount is computed once,
/// when the order is built, and never recomputed afterwards. The only field
/// that changes after creation is the status (through [`Order::transition_to`])
/// together with the timestamps and the persistence version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,

    customer_id: CustomerId,

    /// Items in request order.
    items: Vec<OrderItem>,

    status: OrderStatus,

    total_amount: Money,

    shipping_address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,

    /// Optimistic-concurrency token. 0 until first stored.
    #[serde(default)]
    version: u64,

    created_at: DateTime<Utc>,

    updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds a new `Pending` order from its items.
    ///
    /// Fails if there are no items or any item has a zero quantity.
    pub fn new(
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        shipping_address: impl Into<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }

        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            });
        }

        let total_amount = items.iter().try_fold(Money::zero(), |total, item| {
            total
                .checked_add(item.total_price)
                .ok_or_else(|| OrderError::AmountOverflow {
                    product_id: item.product_id.clone(),
                })
        })?;

        Ok(Self {
            id: OrderId::new(),
            customer_id,
            items,
            status: OrderStatus::Pending,
            total_amount,
            shipping_address: shipping_address.into(),
            notes,
            version: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the customer ID.
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the items in the order they were requested.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the total amount captured at creation.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns the persisted version.
    pub fn version(&self) -> u64 {
        self.version
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

    /// Returns true if the order has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Mutations
impl Order {
    /// Moves the order to `to` if the state machine allows it.
    ///
    /// On success the status and update timestamp change; on failure the
    /// order is left untouched.
    pub fn transition_to(&mut self, to: OrderStatus, at: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        self.status = to;
        self.updated_at = at;
        Ok(())
    }

    /// Returns the order stamped with the version it was stored at.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Marks the order as soft-deleted.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
        self.updated_at = at;
    }
}
