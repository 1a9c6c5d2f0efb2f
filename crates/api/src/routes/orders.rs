//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::{ETAG, IF_MATCH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use domain::{Order, OrderItem};
use fulfillment::CreateOrderRequest;
use serde::{Deserialize, Serialize};
use store::{CatalogLookup, InventoryStore, OrderStore};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub customer_id: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub total_price: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub items: Vec<OrderItemResponse>,
    pub status: String,
    pub total_amount: i64,
    pub shipping_address: String,
    pub notes: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            quantity: item.quantity,
            unit_price: item.unit_price.cents(),
            total_price: item.total_price.cents(),
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
            status: order.status().to_string(),
            total_amount: order.total_amount().cents(),
            shipping_address: order.shipping_address().to_string(),
            notes: order.notes().map(str::to_string),
            version: order.version(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

/// Order body with its version as the entity tag.
fn versioned(status: StatusCode, order: &Order) -> Response {
    (
        status,
        [(ETAG, format!("\"{}\"", order.version()))],
        Json(OrderResponse::from(order)),
    )
        .into_response()
}

/// Reads `If-Match: "3"` (or `3`) as an expected order version.
fn expected_version(headers: &HeaderMap) -> Result<Option<u64>, ApiError> {
    let Some(value) = headers.get(IF_MATCH) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .map(|v| v.trim().trim_start_matches("W/").trim_matches('"'))
        .and_then(|v| v.parse().ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest("If-Match must be an order version".to_string()))
}

// -- Handlers --

/// POST /orders
#[tracing::instrument(skip_all)]
pub async fn create<C, I, O>(
    State(state): State<Arc<AppState<C, I, O>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    C: CatalogLookup + 'static,
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let Json(request) = payload?;
    let ctx = state.request_context();
    let _cancel_on_drop = ctx.drop_guard();

    let order = state.service.create_order(&ctx, request).await?;
    Ok(versioned(StatusCode::CREATED, &order))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<C, I, O>(
    State(state): State<Arc<AppState<C, I, O>>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError>
where
    C: CatalogLookup + 'static,
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let ctx = state.request_context();
    let _cancel_on_drop = ctx.drop_guard();

    let order = state.service.get_order_by_id(&ctx, &id).await?;
    Ok(versioned(StatusCode::OK, &order))
}

/// GET /orders?customer_id=
#[tracing::instrument(skip(state))]
pub async fn list<C, I, O>(
    State(state): State<Arc<AppState<C, I, O>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    C: CatalogLookup + 'static,
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let ctx = state.request_context();
    let _cancel_on_drop = ctx.drop_guard();

    let customer_id = query.customer_id.unwrap_or_default();
    let orders = state.service.list_orders(&ctx, &customer_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// PATCH /orders/{id}/status with a bare JSON string body, e.g. `"SHIPPED"`.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn update_status<C, I, O>(
    State(state): State<Arc<AppState<C, I, O>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<String>, JsonRejection>,
) -> Result<Response, ApiError>
where
    C: CatalogLookup + 'static,
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let Json(new_status) = payload?;
    let expected = expected_version(&headers)?;
    let ctx = state.request_context();
    let _cancel_on_drop = ctx.drop_guard();

    let order = state
        .service
        .update_order_status(&ctx, &id, &new_status, expected)
        .await?;
    Ok(versioned(StatusCode::OK, &order))
}
