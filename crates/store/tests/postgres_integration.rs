//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use serial_test::serial;
use sqlx::PgPool;
use store::{
    Catalog, Money, NewOrder, NewOrderItem, NewProduct, OrderId, OrderStore, PostgresShopStore,
    Product, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresShopStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresShopStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, products RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresShopStore::new(pool)
}

async fn lamp(store: &PostgresShopStore, stock: u32) -> Product {
    store
        .insert_product(NewProduct::new("Lamp", Money::from_cents(4999), stock).with_category("Home"))
        .await
        .unwrap()
}

fn order_of(product: &Product, quantity: u32) -> NewOrder {
    NewOrder::new(
        Utc::now(),
        vec![NewOrderItem {
            product_id: product.id,
            quantity,
            unit_price: product.unit_price,
        }],
    )
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn catalog_lookups() {
    let store = get_test_store().await;
    let lamp = lamp(&store, 10).await;

    let fetched = store.get_product(lamp.id).await.unwrap().unwrap();
    assert_eq!(fetched, lamp);
    assert_eq!(fetched.category, "Home");

    let batch = store
        .get_products(&[lamp.id, store::ProductId::new(999)])
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);

    assert_eq!(store.list_products().await.unwrap(), vec![lamp]);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn commit_order_decrements_stock_atomically() {
    let store = get_test_store().await;
    let lamp = lamp(&store, 10).await;

    let order = store.commit_order(order_of(&lamp, 3)).await.unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.total(), Money::from_cents(14997));
    assert_eq!(store.get_product(lamp.id).await.unwrap().unwrap().stock, 7);

    let result = store.commit_order(order_of(&lamp, 8)).await;
    assert!(matches!(
        result,
        Err(StoreError::InsufficientStock {
            available: 7,
            requested: 8,
            ..
        })
    ));
    assert_eq!(store.get_product(lamp.id).await.unwrap().unwrap().stock, 7);
    assert_eq!(store.list_orders().await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn failed_line_rolls_back_earlier_decrements() {
    let store = get_test_store().await;
    let plenty = lamp(&store, 10).await;
    let scarce = lamp(&store, 1).await;

    let mut order = order_of(&plenty, 2);
    order.items.extend(order_of(&scarce, 2).items);

    assert!(store.commit_order(order).await.is_err());
    assert_eq!(store.get_product(plenty.id).await.unwrap().unwrap().stock, 10);
    assert!(store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn concurrent_commits_never_oversell() {
    let store = get_test_store().await;
    let lamp = lamp(&store, 5).await;

    let a = tokio::spawn({
        let store = store.clone();
        let order = order_of(&lamp, 3);
        async move { store.commit_order(order).await }
    });
    let b = tokio::spawn({
        let store = store.clone();
        let order = order_of(&lamp, 3);
        async move { store.commit_order(order).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(store.get_product(lamp.id).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn save_order_replaces_lines_with_version_check() {
    let store = get_test_store().await;
    let lamp = lamp(&store, 10).await;

    let mut new_order = order_of(&lamp, 1);
    new_order.items.extend(order_of(&lamp, 2).items);
    let order = store.commit_order(new_order).await.unwrap();

    let mut edited = order.clone();
    edited.items.remove(0);
    edited.items[0].quantity = 4;
    edited.items[0].unit_price = Money::from_cents(100);

    let saved = store.save_order(edited).await.unwrap();
    assert_eq!(saved.version, order.version + 1);
    assert_eq!(saved.items.len(), 1);
    assert_eq!(saved.items[0].quantity, 4);
    assert_eq!(saved.total(), Money::from_cents(400));

    let stale = store.save_order(order).await;
    assert!(matches!(stale, Err(StoreError::ConcurrencyConflict { .. })));
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn delete_order_removes_lines() {
    let store = get_test_store().await;
    let lamp = lamp(&store, 10).await;
    let order = store.commit_order(order_of(&lamp, 1)).await.unwrap();

    assert!(store.delete_order(order.id).await.unwrap());
    assert!(store.get_order(order.id).await.unwrap().is_none());
    assert!(!store.delete_order(OrderId::new(12345)).await.unwrap());

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
