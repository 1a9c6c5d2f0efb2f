use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, InventoryId, OrderId};
use domain::{InventoryRecord, Money, Order, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{CatalogLookup, InventoryStore, OrderStore, Product, Result, StoreError};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed catalog lookup.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or updates a product.
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, price_cents = EXCLUDED.price_cents, updated_at = NOW()
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.unit_price.cents())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogLookup for PostgresCatalog {
    #[tracing::instrument(skip(self))]
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents FROM products WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<Product> {
            Ok(Product {
                id: ProductId::new(row.try_get::<String, _>("id")?),
                name: row.try_get("name")?,
                unit_price: Money::from_cents(row.try_get("price_cents")?),
            })
        })
        .transpose()
    }
}

const INVENTORY_COLUMNS: &str =
    "id, product_id, quantity, low_stock_threshold, created_at, updated_at, deleted_at";

/// PostgreSQL-backed inventory store.
///
/// Stock changes lock the row (`SELECT ... FOR UPDATE`) inside a transaction,
/// apply the change through [`InventoryRecord`] so the stock status is
/// recomputed in one place, and write both back before committing.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a new record.
    pub async fn insert(&self, record: &InventoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventories (id, product_id, quantity, low_stock_threshold, status, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id().as_uuid())
        .bind(record.product_id().as_str())
        .bind(i64::from(record.quantity()))
        .bind(i64::from(record.low_stock_threshold()))
        .bind(record.status().as_str())
        .bind(record.created_at())
        .bind(record.updated_at())
        .bind(record.deleted_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<InventoryRecord> {
        let quantity: i64 = row.try_get("quantity")?;
        let threshold: i64 = row.try_get("low_stock_threshold")?;

        Ok(InventoryRecord::restore(
            InventoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            ProductId::new(row.try_get::<String, _>("product_id")?),
            to_u32("quantity", quantity)?,
            to_u32("low_stock_threshold", threshold)?,
            row.try_get::<DateTime<Utc>, _>("created_at")?,
            row.try_get::<DateTime<Utc>, _>("updated_at")?,
            row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
        ))
    }

    /// Locks a live record, applies `change`, and writes it back.
    async fn mutate<F>(&self, id: InventoryId, change: F) -> Result<InventoryRecord>
    where
        F: FnOnce(&mut InventoryRecord) -> Result<()> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("inventory", id))?;

        let mut record = Self::row_to_record(row)?;
        change(&mut record)?;

        sqlx::query(
            "UPDATE inventories SET quantity = $2, status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(i64::from(record.quantity()))
        .bind(record.status().as_str())
        .bind(record.updated_at())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: InventoryId) -> Result<Option<InventoryRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_product(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE product_id = $1 AND deleted_at IS NULL"
        ))
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn conditional_decrement(
        &self,
        id: InventoryId,
        quantity: u32,
    ) -> Result<InventoryRecord> {
        self.mutate(id, |record| Ok(record.decrement(quantity, Utc::now())?))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn increment(&self, id: InventoryId, quantity: u32) -> Result<InventoryRecord> {
        self.mutate(id, |record| Ok(record.increment(quantity, Utc::now())?))
            .await
    }
}

/// PostgreSQL-backed order store.
///
/// The full order is kept as a JSONB document; `customer_id`, `status`,
/// `version`, and the timestamps are mirrored into columns for filtering and
/// for the compare-and-set on `version`.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let document: serde_json::Value = row.try_get("document")?;
        Ok(serde_json::from_value(document)?)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn insert(&self, order: Order) -> Result<Order> {
        let stored = order.with_version(1);
        let document = serde_json::to_value(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, version, created_at, updated_at, deleted_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(stored.id().as_uuid())
        .bind(stored.customer_id().as_uuid())
        .bind(stored.status().as_str())
        .bind(version_to_i64(stored.version())?)
        .bind(stored.created_at())
        .bind(stored.updated_at())
        .bind(stored.deleted_at())
        .bind(document)
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id(), status = %order.status()))]
    async fn update_status(&self, order: &Order) -> Result<Order> {
        let expected = order.version();
        let stored = order.clone().with_version(expected + 1);
        let document = serde_json::to_value(&stored)?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, updated_at = $3, version = $4, document = $5
            WHERE id = $1 AND version = $6 AND deleted_at IS NULL
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(stored.status().as_str())
        .bind(stored.updated_at())
        .bind(version_to_i64(stored.version())?)
        .bind(document)
        .bind(version_to_i64(expected)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(stored);
        }

        // Nothing matched: tell a missing order apart from a stale version.
        let actual: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM orders WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(order.id().as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match actual {
            Some(actual) => Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected,
                actual: u64::try_from(actual)
                    .map_err(|_| StoreError::InvalidData(format!("negative version {actual}")))?,
            }),
            None => Err(StoreError::not_found("order", order.id())),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT document FROM orders WHERE id = $1 AND deleted_at IS NULL")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM orders
            WHERE customer_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

fn to_u32(column: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{column} out of range: {value}")))
}

fn version_to_i64(version: u64) -> Result<i64> {
    i64::try_from(version)
        .map_err(|_| StoreError::InvalidData(format!("version out of range: {version}")))
}
