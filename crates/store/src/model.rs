//! Persisted records: catalog products, orders and order lines.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Money, OrderId, OrderItemId, ProductId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub category: String,
    /// Remaining sellable units.
    pub stock: u32,
}

/// A product that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub unit_price: Money,
    #[serde(default)]
    pub category: String,
    pub stock: u32,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, unit_price: Money, stock: u32) -> Self {
        Self {
            name: name.into(),
            unit_price,
            category: String::new(),
            stock,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    /// Bumped on every successful save; used for optimistic concurrency.
    pub version: i64,
    /// Lines in ascending id order.
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Sum of `unit_price * quantity` over all lines.
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Like `total`, but `None` if any line total or the sum overflows.
    pub fn checked_total(&self) -> Option<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.unit_price.checked_multiply(item.quantity)?)
        })
    }

    pub fn item(&self, id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == id)
    }
}

/// One line of a persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price per unit captured when the line was written.
    pub unit_price: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order to be committed together with its stock decrements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_date: DateTime<Utc>,
    pub items: Vec<NewOrderItem>,
}

/// A line of an order that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl NewOrder {
    pub fn new(order_date: DateTime<Utc>, items: Vec<NewOrderItem>) -> Self {
        Self { order_date, items }
    }

    /// Units to take from each product, keyed in ascending product id order.
    ///
    /// Lines for the same product are summed.
    pub fn stock_demand(&self) -> BTreeMap<ProductId, u32> {
        let mut demand = BTreeMap::new();
        for item in &self.items {
            let entry: &mut u32 = demand.entry(item.product_id).or_default();
            *entry = entry.saturating_add(item.quantity);
        }
        demand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product: i64, quantity: u32, cents: i64) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(product),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    #[test]
    fn stock_demand_sums_duplicate_products() {
        let order = NewOrder::new(Utc::now(), vec![line(2, 1, 100), line(1, 3, 50), line(2, 4, 100)]);
        let demand: Vec<_> = order.stock_demand().into_iter().collect();
        assert_eq!(demand, vec![(ProductId::new(1), 3), (ProductId::new(2), 5)]);
    }

    #[test]
    fn order_total_is_sum_of_lines() {
        let order_id = OrderId::new(1);
        let order = Order {
            id: order_id,
            order_date: Utc::now(),
            version: 1,
            items: vec![
                OrderItem {
                    id: OrderItemId::new(1),
                    order_id,
                    product_id: ProductId::new(1),
                    quantity: 3,
                    unit_price: Money::from_cents(4999),
                },
                OrderItem {
                    id: OrderItemId::new(2),
                    order_id,
                    product_id: ProductId::new(2),
                    quantity: 1,
                    unit_price: Money::from_cents(3),
                },
            ],
        };
        assert_eq!(order.total(), Money::from_cents(15000));
        assert_eq!(order.checked_total(), Some(Money::from_cents(15000)));
        assert_eq!(order.item(OrderItemId::new(2)).unwrap().quantity, 1);
        assert!(order.item(OrderItemId::new(9)).is_none());
    }

    #[test]
    fn checked_total_reports_overflow() {
        let order_id = OrderId::new(1);
        let item = |id: i64, quantity: u32, cents: i64| OrderItem {
            id: OrderItemId::new(id),
            order_id,
            product_id: ProductId::new(id),
            quantity,
            unit_price: Money::from_cents(cents),
        };
        let mut order = Order {
            id: order_id,
            order_date: Utc::now(),
            version: 1,
            items: vec![item(1, 2, i64::MAX)],
        };
        assert_eq!(order.checked_total(), None);

        order.items = vec![item(1, 1, i64::MAX), item(2, 1, 1)];
        assert_eq!(order.checked_total(), None);
        assert_eq!(order.total(), Money::from_cents(i64::MAX));
    }

    #[test]
    fn new_product_deserializes_without_category() {
        let json = r#"{"name":"Lamp","unit_price":4999,"stock":10}"#;
        let product: NewProduct = serde_json::from_str(json).unwrap();
        assert_eq!(product, NewProduct::new("Lamp", Money::from_cents(4999), 10));
    }
}
