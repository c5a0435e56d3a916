//! Checkout: turns selections into a committed order.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use common::{Money, ProductId};
use store::{NewOrder, Order, Product, ShopStore, StoreError};

use super::validation::{Selection, plan_order_items, selected};
use crate::error::{DomainError, ValidationError};

/// A catalog entry offered on the order form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableProduct {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub stock: u32,
    pub selected: bool,
    pub quantity: u32,
}

impl From<Product> for SelectableProduct {
    fn from(product: Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name,
            unit_price: product.unit_price,
            stock: product.stock,
            selected: false,
            quantity: 1,
        }
    }
}

/// Service that validates selections and commits orders.
pub struct CheckoutService<S: ShopStore> {
    store: S,
}

impl<S: ShopStore> CheckoutService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the whole catalog, unselected with quantity 1, for the order form.
    #[tracing::instrument(skip(self))]
    pub async fn selectable_products(&self) -> Result<Vec<SelectableProduct>, DomainError> {
        let products = self.store.list_products().await?;
        Ok(products.into_iter().map(SelectableProduct::from).collect())
    }

    /// Validates the selections and commits a new order.
    ///
    /// All violations are reported together. Nothing is written unless every
    /// line passes; the stock decrements and the order are committed as one
    /// atomic write.
    #[tracing::instrument(skip(self, selections), fields(lines = selections.len()))]
    pub async fn checkout(&self, selections: &[Selection]) -> Result<Order, DomainError> {
        let start = Instant::now();

        let result = self.try_checkout(selections).await;

        let duration = start.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);

        match &result {
            Ok(order) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    lines = order.items.len(),
                    total = %order.total(),
                    "order placed"
                );
            }
            Err(DomainError::Validation(errors)) => {
                metrics::counter!("checkout_rejected_total").increment(1);
                tracing::info!(violations = errors.len(), "checkout rejected");
            }
            Err(e) => {
                tracing::error!(error = %e, "checkout failed");
            }
        }

        result
    }

    async fn try_checkout(&self, selections: &[Selection]) -> Result<Order, DomainError> {
        let selected = selected(selections)?;

        let mut ids: Vec<ProductId> = selected.iter().map(|s| s.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let products = self.store.get_products(&ids).await?;

        let items = plan_order_items(&selected, &products)?;

        self.store
            .commit_order(NewOrder::new(Utc::now(), items))
            .await
            .map_err(|e| commit_error(e, &products))
    }
}

/// Stock lost to a concurrent checkout is reported like any other shortage.
fn commit_error(err: StoreError, products: &HashMap<ProductId, Product>) -> DomainError {
    match err {
        StoreError::InsufficientStock {
            product_id,
            available,
            requested,
        } => ValidationError::InsufficientStock {
            product_id,
            product_name: products
                .get(&product_id)
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            available,
            requested,
        }
        .into(),
        StoreError::ProductNotFound(product_id) => {
            ValidationError::ProductNotFound { product_id }.into()
        }
        other => DomainError::Transaction(other),
    }
}
