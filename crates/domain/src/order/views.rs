//! Read models for order listings, details and the edit form.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderItemId, ProductId};
use serde::Serialize;
use store::{Order, OrderItem, Product};

/// An order line with its product name and line total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product_name: String,
    pub line_total: Money,
}

/// An order as shown in listings and on the details page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub version: i64,
    pub lines: Vec<OrderLine>,
    pub total: Money,
}

impl OrderDetails {
    /// Builds the view, naming lines from `products`.
    ///
    /// Lines whose product is no longer in the catalog get an empty name.
    pub fn new(order: Order, products: &HashMap<ProductId, Product>) -> Self {
        let total = order.total();
        let lines = order
            .items
            .into_iter()
            .map(|item| OrderLine {
                product_name: product_name(products, item.product_id),
                line_total: item.line_total(),
                item,
            })
            .collect();

        Self {
            id: order.id,
            order_date: order.order_date,
            version: order.version,
            lines,
            total,
        }
    }
}

/// One editable row of the order edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditableLine {
    pub order_item_id: OrderItemId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// An order loaded for editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEditForm {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    /// Echo back on submit so concurrent edits are detected.
    pub version: i64,
    pub items: Vec<EditableLine>,
}

impl OrderEditForm {
    pub fn new(order: Order, products: &HashMap<ProductId, Product>) -> Self {
        let items = order
            .items
            .into_iter()
            .map(|item| EditableLine {
                order_item_id: item.id,
                product_name: product_name(products, item.product_id),
                unit_price: item.unit_price,
                quantity: item.quantity,
            })
            .collect();

        Self {
            id: order.id,
            order_date: order.order_date,
            version: order.version,
            items,
        }
    }
}

fn product_name(products: &HashMap<ProductId, Product>, id: ProductId) -> String {
    products
        .get(&id)
        .map(|p| p.name.clone())
        .unwrap_or_default()
}

/// Distinct product ids referenced by the orders' lines.
pub(crate) fn referenced_products<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = orders
        .into_iter()
        .flat_map(|order| order.items.iter().map(|item| item.product_id))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
