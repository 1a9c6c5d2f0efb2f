//! Fulfillment service configuration.

/// Tunables for [`OrderFulfillmentService`](crate::OrderFulfillmentService).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FulfillmentConfig {
    /// Compare requested quantities with the stock read during assembly and
    /// fail early. Off by default: the conditional decrement at reservation
    /// time decides availability either way.
    pub advisory_stock_check: bool,
}

impl FulfillmentConfig {
    pub fn with_advisory_stock_check(mut self, enabled: bool) -> Self {
        self.advisory_stock_check = enabled;
        self
    }
}
