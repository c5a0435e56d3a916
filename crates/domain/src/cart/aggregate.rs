//! Cart aggregate.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use store::Product;

/// A product placed in the cart, with name and price captured at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// The pending selection of one session.
///
/// Serialized as a plain array of lines so it can be stored in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines in the order they were first added.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Adds `quantity` units of `product`, clamping the quantity to at least 1.
    ///
    /// An existing line for the product absorbs the quantity; its snapshot
    /// name and price are kept.
    pub fn add(&mut self, product: &Product, quantity: i64) {
        let quantity = clamp_quantity(quantity.max(1));

        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.unit_price,
                quantity,
            }),
        }
    }

    /// Sets the quantity of an existing line; zero or less removes it.
    ///
    /// Returns false if the product is not in the cart.
    pub fn update(&mut self, product_id: ProductId, quantity: i64) -> bool {
        let Some(index) = self.lines.iter().position(|l| l.product_id == product_id) else {
            return false;
        };

        if quantity <= 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = clamp_quantity(quantity);
        }
        true
    }

    /// Removes every line for the product.
    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity).unwrap_or(u32::MAX)
}
