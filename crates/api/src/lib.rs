//! HTTP API server with observability for the order fulfillment backend.
//!
//! Exposes order creation, lookup, listing, and status changes over REST,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, patch};
use fulfillment::{OrderFulfillmentService, RequestContext};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::{
    CatalogLookup, InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore, InventoryStore,
    OrderStore, PostgresCatalog, PostgresInventoryStore, PostgresOrderStore, StoreError,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

pub type InMemoryFulfillment =
    OrderFulfillmentService<InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore>;

pub type PostgresFulfillment =
    OrderFulfillmentService<PostgresCatalog, PostgresInventoryStore, PostgresOrderStore>;

/// Shared application state accessible from all handlers.
pub struct AppState<C, I, O> {
    pub service: OrderFulfillmentService<C, I, O>,
    pub request_timeout: Duration,
}

impl<C, I, O> AppState<C, I, O> {
    pub fn new(service: OrderFulfillmentService<C, I, O>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }

    /// A fresh context carrying this server's request deadline.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<C, I, O>(state: Arc<AppState<C, I, O>>, metrics_handle: PrometheusHandle) -> Router
where
    C: CatalogLookup + 'static,
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list::<C, I, O>).post(routes::orders::create::<C, I, O>),
        )
        .route("/orders/{id}", get(routes::orders::get::<C, I, O>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<C, I, O>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// State backed by in-memory stores. The stores are returned for seeding.
pub fn in_memory_state(
    config: &Config,
) -> (
    Arc<AppState<InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore>>,
    InMemoryCatalog,
    InMemoryInventoryStore,
) {
    let catalog = InMemoryCatalog::new();
    let inventory = InMemoryInventoryStore::new();
    let service: InMemoryFulfillment =
        OrderFulfillmentService::new(catalog.clone(), inventory.clone(), InMemoryOrderStore::new())
            .with_config(config.fulfillment());

    (
        Arc::new(AppState::new(service, config.request_timeout)),
        catalog,
        inventory,
    )
}

/// State backed by PostgreSQL. Runs pending migrations first.
pub async fn postgres_state(
    config: &Config,
    database_url: &str,
) -> Result<Arc<AppState<PostgresCatalog, PostgresInventoryStore, PostgresOrderStore>>, StoreError>
{
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    store::run_migrations(&pool).await?;

    let service: PostgresFulfillment = OrderFulfillmentService::new(
        PostgresCatalog::new(pool.clone()),
        PostgresInventoryStore::new(pool.clone()),
        PostgresOrderStore::new(pool),
    )
    .with_config(config.fulfillment());

    Ok(Arc::new(AppState::new(service, config.request_timeout)))
}
