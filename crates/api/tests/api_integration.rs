//! Integration tests for the API server.

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::Utc;
use common::{CustomerId, InventoryId};
use domain::{InventoryRecord, Money};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryInventoryStore, Product};
use tower::ServiceExt;

use api::config::Config;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    inventory: InMemoryInventoryStore,
    widget: InventoryId,
    gadget: InventoryId,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    async fn with_config(config: Config) -> Self {
        let (state, catalog, inventory) = api::in_memory_state(&config);

        catalog
            .add_product(Product::new("SKU-001", "Widget", Money::from_cents(1000)))
            .await;
        catalog
            .add_product(Product::new("SKU-002", "Gadget", Money::from_cents(2500)))
            .await;
        let widget = inventory
            .insert(InventoryRecord::new("SKU-001", 10, 2, Utc::now()))
            .await;
        let gadget = inventory
            .insert(InventoryRecord::new("SKU-002", 3, 1, Utc::now()))
            .await;

        Self {
            app: api::create_app(state, get_metrics_handle()),
            inventory,
            widget,
            gadget,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn patch_status(&self, id: &str, body: &str, if_match: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("PATCH")
            .uri(format!("/orders/{id}/status"))
            .header("content-type", "application/json");
        if let Some(version) = if_match {
            builder = builder.header("if-match", version);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn create_order(&self, customer: CustomerId, items: serde_json::Value) -> Response {
        self.post_json(
            "/orders",
            serde_json::json!({
                "customerID": customer.to_string(),
                "items": items,
                "shippingAddress": "1 Main St",
                "notes": "leave at door",
            }),
        )
        .await
    }

    async fn create_order_id(&self) -> String {
        let response = self
            .create_order(
                CustomerId::new(),
                serde_json::json!([{"productID": "SKU-001", "quantity": 1}]),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new().await;

    let response = t.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let t = TestApp::new().await;
    let customer = CustomerId::new();

    let response = t
        .create_order(
            customer,
            serde_json::json!([
                {"productID": "SKU-001", "quantity": 2},
                {"productID": "SKU-002", "quantity": 1},
            ]),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["etag"], "\"1\"");

    let json = body_json(response).await;
    assert_eq!(json["customer_id"], customer.to_string());
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["total_amount"], 4500);
    assert_eq!(json["version"], 1);
    assert_eq!(json["notes"], "leave at door");
    assert_eq!(json["items"][0]["product_id"], "SKU-001");
    assert_eq!(json["items"][0]["unit_price"], 1000);
    assert_eq!(json["items"][0]["total_price"], 2000);

    assert_eq!(t.inventory.quantity_of(t.widget).await, Some(8));
    assert_eq!(t.inventory.quantity_of(t.gadget).await, Some(2));
}

#[tokio::test]
async fn test_create_order_malformed_json() {
    let t = TestApp::new().await;

    let response = t
        .send(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_create_order_validation_error() {
    let t = TestApp::new().await;

    let response = t
        .post_json(
            "/orders",
            serde_json::json!({
                "items": [{"productID": "SKU-001", "quantity": 1}],
                "shippingAddress": "1 Main St",
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["message"], "customer ID is required");
}

#[tokio::test]
async fn test_create_order_insufficient_stock_restores_inventory() {
    let t = TestApp::new().await;

    let response = t
        .create_order(
            CustomerId::new(),
            serde_json::json!([
                {"productID": "SKU-001", "quantity": 4},
                {"productID": "SKU-002", "quantity": 5},
            ]),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "insufficient_stock");
    assert_eq!(t.inventory.quantity_of(t.widget).await, Some(10));
    assert_eq!(t.inventory.quantity_of(t.gadget).await, Some(3));
}

#[tokio::test]
async fn test_create_order_unknown_product() {
    let t = TestApp::new().await;

    let response = t
        .create_order(
            CustomerId::new(),
            serde_json::json!([{"productID": "SKU-404", "quantity": 1}]),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_get_order() {
    let t = TestApp::new().await;
    let id = t.create_order_id().await;

    let response = t.get(&format!("/orders/{id}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], id);
    assert_eq!(json["status"], "PENDING");
}

#[tokio::test]
async fn test_get_order_not_found_and_malformed() {
    let t = TestApp::new().await;

    let response = t.get(&format!("/orders/{}", CustomerId::new())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t.get("/orders/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_for_customer() {
    let t = TestApp::new().await;
    let customer = CustomerId::new();

    for _ in 0..2 {
        let response = t
            .create_order(
                customer,
                serde_json::json!([{"productID": "SKU-001", "quantity": 1}]),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    t.create_order_id().await;

    let response = t.get(&format!("/orders?customer_id={customer}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let orders = json.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["customer_id"] == customer.to_string()));
}

#[tokio::test]
async fn test_list_orders_requires_customer() {
    let t = TestApp::new().await;

    let response = t.get("/orders").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "customer ID is required");
}

#[tokio::test]
async fn test_update_status() {
    let t = TestApp::new().await;
    let id = t.create_order_id().await;

    let response = t.patch_status(&id, "\"PROCESSING\"", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["etag"], "\"2\"");
    let json = body_json(response).await;
    assert_eq!(json["status"], "PROCESSING");
    assert_eq!(json["version"], 2);
}

#[tokio::test]
async fn test_update_status_illegal_transition() {
    let t = TestApp::new().await;
    let id = t.create_order_id().await;

    let response = t.patch_status(&id, "\"SHIPPED\"", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(t.get(&format!("/orders/{id}")).await).await;
    assert_eq!(json["status"], "PENDING");
}

#[tokio::test]
async fn test_update_status_unknown_value() {
    let t = TestApp::new().await;
    let id = t.create_order_id().await;

    let response = t.patch_status(&id, "\"ON_HOLD\"", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t.patch_status(&id, "{\"status\": \"SHIPPED\"}", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_status_with_if_match() {
    let t = TestApp::new().await;
    let id = t.create_order_id().await;

    let response = t.patch_status(&id, "\"PROCESSING\"", Some("\"1\"")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.patch_status(&id, "\"CANCELLED\"", Some("\"1\"")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "conflict");

    let response = t.patch_status(&id, "\"CANCELLED\"", Some("2")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_deadline_is_request_timeout() {
    let config = Config {
        request_timeout: Duration::ZERO,
        ..Config::default()
    };
    let t = TestApp::with_config(config).await;

    let response = t.get(&format!("/orders?customer_id={}", CustomerId::new())).await;

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body_json(response).await["error"], "cancelled");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new().await;
    t.create_order_id().await;

    let response = t.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
}
