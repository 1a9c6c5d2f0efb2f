//! Inventory reservation with compensating rollback.
//!
//! Reservation is a small saga: each successful decrement is recorded in a
//! [`ReservationLedger`]. When a later step fails the ledger is unwound in
//! reverse, returning each reserved quantity to stock. Compensations that
//! fail are logged, counted, and handed to a [`ReconciliationHook`] for
//! out-of-band repair; they never mask the error that triggered the rollback.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::InventoryId;
use domain::ProductId;
use store::InventoryStore;
use tokio::sync::Mutex;

use crate::error::{FulfillmentError, Result};

/// Stock one order line needs from one inventory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReservation {
    pub inventory_id: InventoryId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Reservations to apply, in order-line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPlan {
    entries: Vec<PlannedReservation>,
}

impl ReservationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PlannedReservation) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedReservation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<PlannedReservation> for ReservationPlan {
    fn from_iter<T: IntoIterator<Item = PlannedReservation>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Reservations that were applied, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationLedger {
    reserved: Vec<PlannedReservation>,
}

impl ReservationLedger {
    pub fn entries(&self) -> &[PlannedReservation] {
        &self.reserved
    }

    pub fn len(&self) -> usize {
        self.reserved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserved.is_empty()
    }
}

/// A compensation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    pub inventory_id: InventoryId,
    pub product_id: ProductId,
    /// Units that were reserved and not returned.
    pub quantity: u32,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Outcome of unwinding a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Reservations returned to stock, in the order they were undone.
    pub restored: Vec<PlannedReservation>,
    pub failed: Vec<CompensationFailure>,
}

impl RollbackReport {
    /// Returns true if every reservation was returned to stock.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Receives compensations that failed so stock can be repaired later.
#[async_trait]
pub trait ReconciliationHook: Send + Sync {
    async fn compensation_failed(&self, failure: &CompensationFailure);
}

/// Default hook: records the failure in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReconciliation;

#[async_trait]
impl ReconciliationHook for LoggingReconciliation {
    async fn compensation_failed(&self, failure: &CompensationFailure) {
        tracing::error!(
            inventory_id = %failure.inventory_id,
            product_id = %failure.product_id,
            quantity = failure.quantity,
            reason = %failure.reason,
            "stock needs manual reconciliation"
        );
    }
}

/// Hook that keeps failures in memory for audit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReconciliationLog {
    failures: Arc<Mutex<Vec<CompensationFailure>>>,
}

impl InMemoryReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the failures not yet drained.
    pub async fn pending(&self) -> Vec<CompensationFailure> {
        self.failures.lock().await.clone()
    }

    /// Removes and returns every pending failure.
    pub async fn drain(&self) -> Vec<CompensationFailure> {
        std::mem::take(&mut *self.failures.lock().await)
    }
}

#[async_trait]
impl ReconciliationHook for InMemoryReconciliationLog {
    async fn compensation_failed(&self, failure: &CompensationFailure) {
        self.failures.lock().await.push(failure.clone());
    }
}

/// Applies reservation plans against an inventory store.
///
/// Cloning is cheap and shares the store and hook, so a clone can be moved
/// into a spawned task.
pub struct ReservationCoordinator<I> {
    inventory: Arc<I>,
    hook: Arc<dyn ReconciliationHook>,
}

impl<I> Clone for ReservationCoordinator<I> {
    fn clone(&self) -> Self {
        Self {
            inventory: Arc::clone(&self.inventory),
            hook: Arc::clone(&self.hook),
        }
    }
}

impl<I> ReservationCoordinator<I>
where
    I: InventoryStore,
{
    /// Creates a coordinator that logs failed compensations.
    pub fn new(inventory: I) -> Self {
        Self {
            inventory: Arc::new(inventory),
            hook: Arc::new(LoggingReconciliation),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ReconciliationHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Decrements stock for every entry, in plan order.
    ///
    /// Stops at the first failure, rolls back what was already reserved, and
    /// returns the failure.
    #[tracing::instrument(skip(self, plan), fields(entries = plan.len()))]
    pub async fn reserve(&self, plan: &ReservationPlan) -> Result<ReservationLedger> {
        let mut ledger = ReservationLedger::default();

        for entry in plan.iter() {
            if let Err(err) = self
                .inventory
                .conditional_decrement(entry.inventory_id, entry.quantity)
                .await
            {
                metrics::counter!("inventory_reservation_failures_total").increment(1);
                tracing::warn!(
                    product_id = %entry.product_id,
                    quantity = entry.quantity,
                    reserved = ledger.len(),
                    error = %err,
                    "reservation failed, rolling back"
                );

                self.rollback(ledger).await;
                return Err(FulfillmentError::from(err).context("reserving inventory"));
            }

            ledger.reserved.push(entry.clone());
        }

        metrics::counter!("inventory_reservations_total").increment(ledger.len() as u64);
        Ok(ledger)
    }

    /// Returns every reserved quantity to stock, newest reservation first.
    ///
    /// Never fails: compensations that cannot be applied are reported to the
    /// hook and listed in the returned report.
    #[tracing::instrument(skip(self, ledger), fields(entries = ledger.len()))]
    pub async fn rollback(&self, ledger: ReservationLedger) -> RollbackReport {
        let mut report = RollbackReport::default();

        for entry in ledger.reserved.into_iter().rev() {
            match self
                .inventory
                .increment(entry.inventory_id, entry.quantity)
                .await
            {
                Ok(_) => report.restored.push(entry),
                Err(err) => {
                    metrics::counter!("inventory_compensation_failures_total").increment(1);
                    tracing::error!(
                        inventory_id = %entry.inventory_id,
                        product_id = %entry.product_id,
                        quantity = entry.quantity,
                        error = %err,
                        "compensation failed"
                    );

                    let failure = CompensationFailure {
                        inventory_id: entry.inventory_id,
                        product_id: entry.product_id,
                        quantity: entry.quantity,
                        reason: err.to_string(),
                        occurred_at: Utc::now(),
                    };
                    self.hook.compensation_failed(&failure).await;
                    report.failed.push(failure);
                }
            }
        }

        if report.is_complete() {
            tracing::info!(restored = report.restored.len(), "reservations rolled back");
        }
        report
    }
}
