use chrono::Utc;
use common::CustomerId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{InventoryRecord, Money};
use fulfillment::{CreateOrderRequest, OrderFulfillmentService, RequestContext};
use store::{InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore, Product};

type BenchService =
    OrderFulfillmentService<InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore>;

async fn make_service(stock: u32) -> BenchService {
    let catalog = InMemoryCatalog::new();
    let inventory = InMemoryInventoryStore::new();
    for sku in ["SKU-001", "SKU-002", "SKU-003"] {
        catalog
            .add_product(Product::new(sku, sku, Money::from_cents(1000)))
            .await;
        inventory
            .insert(InventoryRecord::new(sku, stock, 10, Utc::now()))
            .await;
    }
    OrderFulfillmentService::new(catalog, inventory, InMemoryOrderStore::new())
}

fn three_item_request() -> CreateOrderRequest {
    CreateOrderRequest::new(CustomerId::new(), "1 Main St")
        .item("SKU-001", 1)
        .item("SKU-002", 2)
        .item("SKU-003", 1)
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = rt.block_on(make_service(u32::MAX));
    let ctx = RequestContext::new();

    c.bench_function("fulfillment/create_order_3_items", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create_order(&ctx, three_item_request())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_order_with_rollback(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("fulfillment/create_order_rollback", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = make_service(1).await;
                let result = service
                    .create_order(&RequestContext::new(), three_item_request())
                    .await;
                assert!(result.is_err());
            });
        });
    });
}

fn bench_status_transition(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = rt.block_on(make_service(u32::MAX));
    let ctx = RequestContext::new();

    c.bench_function("fulfillment/pending_to_processing", |b| {
        b.iter(|| {
            rt.block_on(async {
                let order = service
                    .create_order(&ctx, three_item_request())
                    .await
                    .unwrap();
                service
                    .update_order_status(&ctx, &order.id().to_string(), "PROCESSING", None)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_create_order_with_rollback,
    bench_status_transition
);
criterion_main!(benches);
