//! Checkout validation against a catalog snapshot.

use std::collections::{BTreeMap, HashMap};

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use store::{NewOrderItem, Product};

use crate::error::{ValidationError, ValidationErrors};

/// A product and quantity the shopper asked to buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl Selection {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Selections with a positive quantity, in request order.
///
/// Fails with `NoItemsSelected` if nothing remains.
pub fn selected(selections: &[Selection]) -> Result<Vec<Selection>, ValidationErrors> {
    let selected: Vec<_> = selections
        .iter()
        .copied()
        .filter(|s| s.quantity > 0)
        .collect();

    if selected.is_empty() {
        return Err(ValidationError::NoItemsSelected.into());
    }
    Ok(selected)
}

/// Checks quantities, product existence and stock, collecting every
/// violation.
///
/// On success returns one order line per selection, priced from `products`.
/// Stock is compared against the summed quantity of all selections of the
/// same product.
pub fn plan_order_items(
    selected: &[Selection],
    products: &HashMap<ProductId, Product>,
) -> Result<Vec<NewOrderItem>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut lines = Vec::with_capacity(selected.len());

    for selection in selected {
        match u32::try_from(selection.quantity) {
            Ok(quantity) if quantity > 0 => lines.push((selection.product_id, quantity)),
            _ => errors.push(ValidationError::InvalidQuantity {
                product_id: selection.product_id,
                quantity: selection.quantity,
            }),
        }
    }

    for selection in selected {
        if !products.contains_key(&selection.product_id) {
            errors.push(ValidationError::ProductNotFound {
                product_id: selection.product_id,
            });
        }
    }

    let mut demand: BTreeMap<ProductId, u32> = BTreeMap::new();
    for &(product_id, quantity) in &lines {
        let entry = demand.entry(product_id).or_default();
        *entry = entry.saturating_add(quantity);
    }
    for (product_id, requested) in demand {
        if let Some(product) = products.get(&product_id)
            && product.stock < requested
        {
            errors.push(ValidationError::InsufficientStock {
                product_id,
                product_name: product.name.clone(),
                available: product.stock,
                requested,
            });
        }
    }

    let total = lines
        .iter()
        .try_fold(Money::zero(), |acc, &(product_id, quantity)| {
            match products.get(&product_id) {
                Some(product) => acc.checked_add(product.unit_price.checked_multiply(quantity)?),
                None => Some(acc),
            }
        });
    if total.is_none() {
        errors.push(ValidationError::OrderTotalOverflow);
    }

    errors.into_result()?;

    Ok(lines
        .into_iter()
        .filter_map(|(product_id, quantity)| {
            products.get(&product_id).map(|product| NewOrderItem {
                product_id,
                quantity,
                unit_price: product.unit_price,
            })
        })
        .collect())
}
