use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    NewOrder, NewProduct, Order, OrderId, OrderItem, OrderItemId, Product, ProductId, Result,
    StoreError,
    store::{Catalog, OrderStore},
};

#[derive(Debug, Default)]
struct ShopState {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    last_product_id: i64,
    last_order_id: i64,
    last_item_id: i64,
    fail_next_commit: bool,
}

/// In-memory shop store.
///
/// A single lock guards products and orders together, so an order commit and
/// its stock decrements are applied under one write guard.
#[derive(Clone, Default)]
pub struct InMemoryShopStore {
    state: Arc<RwLock<ShopState>>,
}

impl InMemoryShopStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product to the catalog and returns it with its assigned id.
    pub async fn insert_product(&self, product: NewProduct) -> Product {
        let mut state = self.state.write().await;
        state.last_product_id += 1;
        let product = Product {
            id: ProductId::new(state.last_product_id),
            name: product.name,
            unit_price: product.unit_price,
            category: product.category,
            stock: product.stock,
        };
        state.products.insert(product.id, product.clone());
        product
    }

    /// Makes the next `commit_order` fail after validation, as a backend
    /// outage would.
    pub async fn fail_next_commit(&self) {
        self.state.write().await.fail_next_commit = true;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl Catalog for InMemoryShopStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id))
            .map(|p| (p.id, p.clone()))
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().await.products.values().cloned().collect())
    }
}

#[async_trait]
impl OrderStore for InMemoryShopStore {
    #[tracing::instrument(skip(self, order), fields(lines = order.items.len()))]
    async fn commit_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;

        // Check every product before touching any of them
        let demand = order.stock_demand();
        for (&product_id, &requested) in &demand {
            let product = state
                .products
                .get(&product_id)
                .ok_or(StoreError::ProductNotFound(product_id))?;
            if product.stock < requested {
                tracing::debug!(%product_id, available = product.stock, requested, "commit rejected");
                return Err(StoreError::InsufficientStock {
                    product_id,
                    available: product.stock,
                    requested,
                });
            }
        }

        if std::mem::take(&mut state.fail_next_commit) {
            tracing::warn!("injected commit failure");
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }

        for (product_id, requested) in demand {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.stock -= requested;
            }
        }

        state.last_order_id += 1;
        let order_id = OrderId::new(state.last_order_id);
        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            state.last_item_id += 1;
            items.push(OrderItem {
                id: OrderItemId::new(state.last_item_id),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        let order = Order {
            id: order_id,
            order_date: order.order_date,
            version: 1,
            items,
        };
        state.orders.insert(order_id, order.clone());

        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, version = order.version))]
    async fn save_order(&self, mut order: Order) -> Result<Order> {
        let mut state = self.state.write().await;

        let stored = state
            .orders
            .get_mut(&order.id)
            .ok_or(StoreError::OrderNotFound(order.id))?;

        if stored.version != order.version {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id,
                expected: order.version,
                actual: stored.version,
            });
        }

        // Only lines that already belong to the order can be kept
        order
            .items
            .retain(|item| stored.items.iter().any(|s| s.id == item.id));
        order.items.sort_by_key(|item| item.id);
        order.order_date = stored.order_date;
        order.version = stored.version + 1;

        *stored = order.clone();
        Ok(order)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        Ok(self.state.write().await.orders.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{Money, NewOrderItem};

    fn line(product_id: ProductId, quantity: u32, cents: i64) -> NewOrderItem {
        NewOrderItem {
            product_id,
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    async fn store_with_lamp(stock: u32) -> (InMemoryShopStore, Product) {
        let store = InMemoryShopStore::new();
        let lamp = store
            .insert_product(NewProduct::new("Lamp", Money::from_cents(4999), stock))
            .await;
        (store, lamp)
    }

    #[tokio::test]
    async fn insert_product_assigns_sequential_ids() {
        let store = InMemoryShopStore::new();
        let a = store
            .insert_product(NewProduct::new("A", Money::from_cents(100), 1))
            .await;
        let b = store
            .insert_product(NewProduct::new("B", Money::from_cents(100), 1))
            .await;
        assert_eq!(a.id, ProductId::new(1));
        assert_eq!(b.id, ProductId::new(2));
    }

    #[tokio::test]
    async fn get_products_skips_unknown_ids() {
        let (store, lamp) = store_with_lamp(5).await;

        let found = store
            .get_products(&[lamp.id, ProductId::new(99)])
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&lamp.id));
    }

    #[tokio::test]
    async fn commit_order_decrements_stock() {
        let (store, lamp) = store_with_lamp(10).await;

        let order = store
            .commit_order(NewOrder::new(Utc::now(), vec![line(lamp.id, 3, 4999)]))
            .await
            .unwrap();

        assert_eq!(order.version, 1);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].order_id, order.id);

        let lamp = store.get_product(lamp.id).await.unwrap().unwrap();
        assert_eq!(lamp.stock, 7);
    }

    #[tokio::test]
    async fn commit_order_rejects_short_stock_without_side_effects() {
        let (store, lamp) = store_with_lamp(2).await;
        let mug = store
            .insert_product(NewProduct::new("Mug", Money::from_cents(500), 10))
            .await;

        let result = store
            .commit_order(NewOrder::new(
                Utc::now(),
                vec![line(mug.id, 1, 500), line(lamp.id, 3, 4999)],
            ))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            })
        ));
        assert_eq!(store.get_product(mug.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn commit_order_checks_summed_demand() {
        let (store, lamp) = store_with_lamp(4).await;

        let result = store
            .commit_order(NewOrder::new(
                Utc::now(),
                vec![line(lamp.id, 3, 4999), line(lamp.id, 2, 4999)],
            ))
            .await;

        assert!(matches!(result, Err(StoreError::InsufficientStock { .. })));
        assert_eq!(store.get_product(lamp.id).await.unwrap().unwrap().stock, 4);
    }

    #[tokio::test]
    async fn injected_failure_leaves_no_trace() {
        let (store, lamp) = store_with_lamp(10).await;
        store.fail_next_commit().await;

        let result = store
            .commit_order(NewOrder::new(Utc::now(), vec![line(lamp.id, 3, 4999)]))
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.get_product(lamp.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(store.order_count().await, 0);

        // The flag is one-shot
        assert!(
            store
                .commit_order(NewOrder::new(Utc::now(), vec![line(lamp.id, 3, 4999)]))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn save_order_bumps_version_and_drops_missing_lines() {
        let (store, lamp) = store_with_lamp(10).await;
        let order = store
            .commit_order(NewOrder::new(
                Utc::now(),
                vec![line(lamp.id, 1, 4999), line(lamp.id, 2, 4999)],
            ))
            .await
            .unwrap();

        let mut edited = order.clone();
        edited.items.remove(0);
        edited.items[0].quantity = 5;

        let saved = store.save_order(edited).await.unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(saved.items.len(), 1);
        assert_eq!(saved.items[0].quantity, 5);

        let reloaded = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(reloaded, saved);
    }

    #[tokio::test]
    async fn save_order_with_stale_version_conflicts() {
        let (store, lamp) = store_with_lamp(10).await;
        let order = store
            .commit_order(NewOrder::new(Utc::now(), vec![line(lamp.id, 1, 4999)]))
            .await
            .unwrap();

        store.save_order(order.clone()).await.unwrap();
        let result = store.save_order(order).await;

        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let (store, lamp) = store_with_lamp(10).await;
        let first = store
            .commit_order(NewOrder::new(Utc::now(), vec![line(lamp.id, 1, 4999)]))
            .await
            .unwrap();
        let second = store
            .commit_order(NewOrder::new(Utc::now(), vec![line(lamp.id, 1, 4999)]))
            .await
            .unwrap();

        let ids: Vec<_> = store
            .list_orders()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn delete_order_reports_existence() {
        let (store, lamp) = store_with_lamp(10).await;
        let order = store
            .commit_order(NewOrder::new(Utc::now(), vec![line(lamp.id, 1, 4999)]))
            .await
            .unwrap();

        assert!(store.delete_order(order.id).await.unwrap());
        assert!(!store.delete_order(order.id).await.unwrap());
        assert!(store.get_order(order.id).await.unwrap().is_none());
    }
}
