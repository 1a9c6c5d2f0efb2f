//! Turns a validated request into a priced order and a reservation plan.

use chrono::Utc;
use domain::{Order, OrderItem};
use store::{CatalogLookup, InventoryStore};

use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, Result};
use crate::request::ValidatedOrder;
use crate::reservation::{PlannedReservation, ReservationPlan};

/// A pending order together with the stock it needs.
#[derive(Debug, Clone)]
pub struct AssembledOrder {
    pub order: Order,
    pub plan: ReservationPlan,
}

/// Prices each line from the catalog and resolves its inventory record.
///
/// Reads only: nothing is reserved or stored here.
pub struct OrderAssembly<'a, C, I> {
    catalog: &'a C,
    inventory: &'a I,
    config: FulfillmentConfig,
}

impl<'a, C, I> OrderAssembly<'a, C, I>
where
    C: CatalogLookup,
    I: InventoryStore,
{
    pub fn new(catalog: &'a C, inventory: &'a I, config: FulfillmentConfig) -> Self {
        Self {
            catalog,
            inventory,
            config,
        }
    }

    /// Builds the order in request line order.
    ///
    /// Unit prices are the catalog prices at this moment; the order keeps them
    /// even if the catalog changes later.
    #[tracing::instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn assemble(&self, request: ValidatedOrder) -> Result<AssembledOrder> {
        let mut items = Vec::with_capacity(request.lines.len());
        let mut plan = ReservationPlan::new();

        for line in &request.lines {
            let product = self
                .catalog
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| FulfillmentError::not_found("product", &line.product_id))?;

            let record = self
                .inventory
                .find_by_product(&line.product_id)
                .await?
                .ok_or_else(|| FulfillmentError::not_found("inventory", &line.product_id))?;

            if self.config.advisory_stock_check && !record.can_reserve(line.quantity) {
                return Err(FulfillmentError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    available: record.quantity(),
                });
            }

            items.push(OrderItem::new(
                line.product_id.clone(),
                line.quantity,
                product.unit_price,
            )?);
            plan.push(PlannedReservation {
                inventory_id: record.id(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            });
        }

        let order = Order::new(
            request.customer_id,
            items,
            request.shipping_address,
            request.notes,
            Utc::now(),
        )?;

        Ok(AssembledOrder { order, plan })
    }
}
