//! Order aggregate and related types.

mod aggregate;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use status::{OrderStatus, can_transition};
pub use value_objects::{Money, OrderItem, ProductId};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A line or order total does not fit in the money range.
    #[error("Order amount out of range for product {product_id}")]
    AmountOverflow { product_id: ProductId },

    /// The value is not one of the known order statuses.
    #[error("Invalid order status: {value:?}")]
    UnknownStatus { value: String },

    /// The state machine does not allow the requested transition.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
