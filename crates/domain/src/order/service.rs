//! Order listing, editing and deletion.

use common::OrderId;
use store::{Order, ShopStore, StoreError};

use super::edit::{LineEdit, apply_edits};
use super::views::{OrderDetails, OrderEditForm, referenced_products};
use crate::error::DomainError;

/// Service for orders that have already been placed.
pub struct OrderService<S: ShopStore> {
    store: S,
}

impl<S: ShopStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All orders, newest first, with product names resolved.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<OrderDetails>, DomainError> {
        let orders = self.store.list_orders().await?;
        let products = self
            .store
            .get_products(&referenced_products(&orders))
            .await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderDetails::new(order, &products))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_details(&self, id: OrderId) -> Result<OrderDetails, DomainError> {
        let order = self.load(id).await?;
        let products = self.store.get_products(&referenced_products([&order])).await?;
        Ok(OrderDetails::new(order, &products))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_for_edit(&self, id: OrderId) -> Result<OrderEditForm, DomainError> {
        let order = self.load(id).await?;
        let products = self.store.get_products(&referenced_products([&order])).await?;
        Ok(OrderEditForm::new(order, &products))
    }

    /// Applies line edits and saves the order.
    ///
    /// When `expected_version` is given and the stored order has moved on,
    /// the edit is rejected with `ConcurrencyConflict`.
    #[tracing::instrument(skip(self, edits), fields(edits = edits.len()))]
    pub async fn edit(
        &self,
        id: OrderId,
        expected_version: Option<i64>,
        edits: &[LineEdit],
    ) -> Result<OrderDetails, DomainError> {
        let mut order = self.load(id).await?;
        if let Some(version) = expected_version {
            order.version = version;
        }

        apply_edits(&mut order, edits)?;

        let saved = self.store.save_order(order).await.map_err(|e| match e {
            StoreError::ConcurrencyConflict { order_id, .. } => {
                DomainError::ConcurrencyConflict { order_id }
            }
            StoreError::OrderNotFound(order_id) => DomainError::order_not_found(order_id),
            other => DomainError::Store(other),
        })?;

        tracing::info!(order_id = %saved.id, version = saved.version, "order updated");

        let products = self.store.get_products(&referenced_products([&saved])).await?;
        Ok(OrderDetails::new(saved, &products))
    }

    /// Deletes the order and its lines. Returns false if it did not exist.
    ///
    /// Stock is not restored.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<bool, DomainError> {
        let deleted = self.store.delete_order(id).await?;
        if deleted {
            metrics::counter!("orders_deleted_total").increment(1);
            tracing::info!(order_id = %id, "order deleted");
        }
        Ok(deleted)
    }

    async fn load(&self, id: OrderId) -> Result<Order, DomainError> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| DomainError::order_not_found(id))
    }
}
