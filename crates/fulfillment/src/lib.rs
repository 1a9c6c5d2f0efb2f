//! Order fulfillment core.
//!
//! Creating an order runs these steps:
//! 1. Validate the request
//! 2. Price each line from the catalog and resolve its inventory record
//! 3. Reserve stock line by line
//! 4. Store the order
//!
//! If step 3 or 4 fails, stock already reserved is returned in reverse order.

pub mod assembly;
pub mod config;
pub mod context;
pub mod error;
pub mod request;
pub mod reservation;
pub mod service;

pub use assembly::{AssembledOrder, OrderAssembly};
pub use config::FulfillmentConfig;
pub use context::RequestContext;
pub use error::{ErrorKind, FulfillmentError, Result, ResultExt};
pub use request::{CreateOrderItemRequest, CreateOrderRequest, OrderLine, ValidatedOrder};
pub use reservation::{
    CompensationFailure, InMemoryReconciliationLog, LoggingReconciliation, PlannedReservation,
    ReconciliationHook, ReservationCoordinator, ReservationLedger, ReservationPlan,
    RollbackReport,
};
pub use service::OrderFulfillmentService;
