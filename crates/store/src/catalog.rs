//! Catalog lookup: resolves products to their current price.

use async_trait::async_trait;
use domain::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::Result;

/// The catalog's view of a product, as needed to price an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
        }
    }
}

/// Read-only product lookup.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Returns the product with its current unit price, or `None` if it
    /// does not exist.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;
}
