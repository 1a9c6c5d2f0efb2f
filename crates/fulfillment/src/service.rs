//! Order fulfillment service: the entry points callers use.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::{CustomerId, OrderId};
use tracing::Instrument;
use domain::{Order, OrderStatus};
use store::{CatalogLookup, InventoryStore, OrderStore};

use crate::assembly::{AssembledOrder, OrderAssembly};
use crate::config::FulfillmentConfig;
use crate::context::RequestContext;
use crate::error::{FulfillmentError, Result, ResultExt};
use crate::request::CreateOrderRequest;
use crate::reservation::{ReconciliationHook, ReservationCoordinator, ReservationPlan};

/// Creates orders, reserving their stock, and drives their status.
///
/// Stock reserved for an order that could not be stored is returned by the
/// reservation coordinator before the error reaches the caller. Reserving and
/// storing run on a spawned task, so they finish or roll back even when the
/// caller's future is dropped halfway.
pub struct OrderFulfillmentService<C, I, O> {
    catalog: C,
    reservations: ReservationCoordinator<I>,
    orders: Arc<O>,
    config: FulfillmentConfig,
}

impl<C, I, O> OrderFulfillmentService<C, I, O>
where
    C: CatalogLookup,
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    pub fn new(catalog: C, inventory: I, orders: O) -> Self {
        Self {
            catalog,
            reservations: ReservationCoordinator::new(inventory),
            orders: Arc::new(orders),
            config: FulfillmentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FulfillmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Sends failed compensations to `hook` instead of only logging them.
    pub fn with_reconciliation_hook(mut self, hook: Arc<dyn ReconciliationHook>) -> Self {
        self.reservations = self.reservations.with_hook(hook);
        self
    }

    pub fn config(&self) -> FulfillmentConfig {
        self.config
    }

    /// Validates, prices, reserves stock for, and stores a new order.
    #[tracing::instrument(
        skip(self, ctx, request),
        fields(customer_id = %request.customer_id, items = request.items.len())
    )]
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        request: CreateOrderRequest,
    ) -> Result<Order> {
        let start = Instant::now();
        let result = self.try_create_order(ctx, request).await;
        metrics::histogram!("order_creation_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    total_amount = order.total_amount().cents(),
                    "order created"
                );
            }
            Err(err) => {
                let kind = err.kind();
                metrics::counter!("order_creation_failures_total", "kind" => kind.as_str())
                    .increment(1);
                tracing::warn!(%kind, error = %err, "order creation failed");
            }
        }

        result
    }

    async fn try_create_order(
        &self,
        ctx: &RequestContext,
        request: CreateOrderRequest,
    ) -> Result<Order> {
        ctx.check("create_order")?;
        let validated = request.validate()?;

        ctx.check("create_order")?;
        let AssembledOrder { order, plan } =
            OrderAssembly::new(&self.catalog, self.reservations.inventory(), self.config)
                .assemble(validated)
                .await
                .context("preparing order items")?;

        // No cancellation checks past this point.
        let reservations = self.reservations.clone();
        let orders = Arc::clone(&self.orders);
        let task = tokio::spawn(
            async move { reserve_and_store(&reservations, orders.as_ref(), order, plan).await }
                .in_current_span(),
        );

        task.await?
    }

    /// Moves an order to `new_status` if the state machine allows it.
    ///
    /// With `expected_version`, the update is refused with `Conflict` unless
    /// the stored order is still at that version. Without it, the version
    /// read here is used, so a concurrent writer still causes a `Conflict`.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn update_order_status(
        &self,
        ctx: &RequestContext,
        id: &str,
        new_status: &str,
        expected_version: Option<u64>,
    ) -> Result<Order> {
        ctx.check("update_order_status")?;

        let to = OrderStatus::parse(new_status)?;
        let order_id = parse_order_id(id)?;

        let mut order = self
            .orders
            .get_by_id(order_id)
            .await
            .context("fetching order")?
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))?;

        match expected_version {
            Some(expected) if expected != order.version() => {
                return Err(FulfillmentError::Conflict(format!(
                    "order {order_id} is at version {}, not {expected}",
                    order.version()
                )));
            }
            _ => {}
        }

        let from = order.status();
        order.transition_to(to, Utc::now())?;

        let updated = self
            .orders
            .update_status(&order)
            .await
            .context("updating order status")?;

        metrics::counter!(
            "order_status_transitions_total",
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
        tracing::info!(%order_id, %from, %to, version = updated.version(), "order status changed");

        Ok(updated)
    }

    /// Loads one order.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_order_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Order> {
        ctx.check("get_order_by_id")?;

        let order_id = parse_order_id(id)?;

        self.orders
            .get_by_id(order_id)
            .await
            .context("fetching order")?
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))
    }

    /// Lists a customer's orders, newest first.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn list_orders(&self, ctx: &RequestContext, customer_id: &str) -> Result<Vec<Order>> {
        ctx.check("list_orders")?;

        if customer_id.trim().is_empty() {
            return Err(FulfillmentError::bad_request("customer ID is required"));
        }
        let customer_id = CustomerId::parse(customer_id)
            .map_err(|err| FulfillmentError::bad_request(err.to_string()))?;

        self.orders
            .list_by_customer(customer_id)
            .await
            .context("listing orders")
    }
}

/// Reserves the plan, then stores the order. Releases the stock if the
/// insert fails.
async fn reserve_and_store<I, O>(
    reservations: &ReservationCoordinator<I>,
    orders: &O,
    order: Order,
    plan: ReservationPlan,
) -> Result<Order>
where
    I: InventoryStore,
    O: OrderStore,
{
    let ledger = reservations.reserve(&plan).await?;

    match orders.insert(order).await {
        Ok(stored) => Ok(stored),
        Err(err) => {
            tracing::warn!(error = %err, "storing order failed, releasing stock");
            reservations.rollback(ledger).await;
            Err(FulfillmentError::from(err).context("creating order"))
        }
    }
}

fn parse_order_id(id: &str) -> Result<OrderId> {
    if id.trim().is_empty() {
        return Err(FulfillmentError::bad_request("order ID is required"));
    }
    OrderId::parse(id).map_err(|err| FulfillmentError::bad_request(err.to_string()))
}
