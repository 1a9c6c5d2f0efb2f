//! Fulfillment error types and their classification.

use domain::{InventoryError, OrderError, ProductId};
use store::StoreError;
use thiserror::Error;

/// Coarse error classification shared with callers.
///
/// Every [`FulfillmentError`] maps to exactly one kind; the HTTP layer maps
/// kinds to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    InsufficientStock,
    Conflict,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by the fulfillment service.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The request failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Stock was short when it was checked or reserved.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The order changed since the caller read it.
    #[error("{0}")]
    Conflict(String),

    /// The caller went away or the deadline passed.
    #[error("{operation} aborted: {reason}")]
    Cancelled {
        operation: &'static str,
        reason: &'static str,
    },

    /// Order rule violation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A spawned fulfillment task panicked or was aborted.
    #[error("fulfillment task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// An error with the step it happened in.
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<FulfillmentError>,
    },
}

impl FulfillmentError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        FulfillmentError::BadRequest(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        FulfillmentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Wraps the error with the step it happened in. The kind is preserved.
    pub fn context(self, context: impl Into<String>) -> Self {
        FulfillmentError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FulfillmentError::BadRequest(_) => ErrorKind::BadRequest,
            FulfillmentError::NotFound { .. } => ErrorKind::NotFound,
            FulfillmentError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            FulfillmentError::Conflict(_) => ErrorKind::Conflict,
            FulfillmentError::Cancelled { .. } => ErrorKind::Cancelled,
            FulfillmentError::Order(_) => ErrorKind::BadRequest,
            FulfillmentError::Task(_) => ErrorKind::Internal,
            FulfillmentError::Store(err) => match err {
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                StoreError::Inventory(InventoryError::InsufficientStock { .. }) => {
                    ErrorKind::InsufficientStock
                }
                StoreError::ConcurrencyConflict { .. } => ErrorKind::Conflict,
                _ => ErrorKind::Internal,
            },
            FulfillmentError::Context { source, .. } => source.kind(),
        }
    }

    /// Message safe to show to a caller. Internal details are hidden.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Returns the innermost error, skipping context layers.
    pub fn root(&self) -> &FulfillmentError {
        match self {
            FulfillmentError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Adds step context to fallible results.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FulfillmentError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.into().context(context))
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::OrderStatus;

    #[test]
    fn test_order_errors_are_bad_requests() {
        let err: FulfillmentError = OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err: FulfillmentError = OrderError::UnknownStatus {
            value: "LOST".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err: FulfillmentError = OrderError::AmountOverflow {
            product_id: ProductId::new("SKU-001"),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_store_errors_are_classified() {
        let cases = [
            (
                StoreError::NotFound {
                    entity: "order",
                    id: "x".to_string(),
                },
                ErrorKind::NotFound,
            ),
            (
                StoreError::Inventory(InventoryError::InsufficientStock {
                    product_id: ProductId::new("SKU-001"),
                    requested: 2,
                    available: 1,
                }),
                ErrorKind::InsufficientStock,
            ),
            (
                StoreError::ConcurrencyConflict {
                    order_id: OrderId::new(),
                    expected: 1,
                    actual: 2,
                },
                ErrorKind::Conflict,
            ),
            (
                StoreError::Unavailable("down".to_string()),
                ErrorKind::Internal,
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(FulfillmentError::from(err).kind(), kind);
        }
    }

    #[test]
    fn test_context_preserves_kind_and_message() {
        let err = FulfillmentError::not_found("product", "SKU-404").context("preparing order items");

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "preparing order items: product not found: SKU-404"
        );
        assert!(matches!(err.root(), FulfillmentError::NotFound { .. }));
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), StoreError> =
            Err(StoreError::Unavailable("insert rejected".to_string()));

        let err = result.context("creating order").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().starts_with("creating order: "));
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let err = FulfillmentError::from(StoreError::Unavailable("db password wrong".to_string()));
        assert_eq!(err.public_message(), "internal server error");

        let err = FulfillmentError::bad_request("customer ID is required");
        assert_eq!(err.public_message(), "customer ID is required");
    }
}
