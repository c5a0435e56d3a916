use std::collections::HashMap;

use async_trait::async_trait;

use crate::{NewOrder, Order, OrderId, Product, ProductId, Result};

/// Read-only product lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Retrieves a single product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Retrieves every product whose id is in `ids`, in one round trip.
    ///
    /// Ids without a matching product are simply absent from the result.
    async fn get_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>>;

    /// Lists the whole catalog in ascending id order.
    async fn list_products(&self) -> Result<Vec<Product>>;
}

/// Persistence for orders and the stock they consume.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Commits an order and decrements stock for every line.
    ///
    /// The write is atomic: stock is re-checked inside it, and if any product
    /// is missing or short the whole commit fails with no stock change and no
    /// order created.
    async fn commit_order(&self, order: NewOrder) -> Result<Order>;

    /// Retrieves an order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Replaces the lines of an existing order.
    ///
    /// `order.version` must match the stored version, otherwise
    /// `ConcurrencyConflict` is returned. Stored lines whose id is not in
    /// `order.items` are deleted. Returns the order with its new version.
    async fn save_order(&self, order: Order) -> Result<Order>;

    /// Deletes an order and its lines. Returns false if it did not exist.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;
}

/// A backend that serves both the catalog and orders.
pub trait ShopStore: Catalog + OrderStore {}

impl<T: Catalog + OrderStore + ?Sized> ShopStore for T {}
