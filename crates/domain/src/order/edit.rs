//! In-place edits of a persisted order's lines.

use common::{Money, OrderItemId};
use serde::{Deserialize, Serialize};
use store::Order;

use crate::error::{ValidationError, ValidationErrors};

/// New quantity and price for one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEdit {
    pub order_item_id: OrderItemId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineEdit {
    pub fn new(order_item_id: OrderItemId, quantity: i64, unit_price: Money) -> Self {
        Self {
            order_item_id,
            quantity,
            unit_price,
        }
    }
}

/// Applies line edits to an order.
///
/// Edits for ids that are not on the order are ignored. Lines whose new
/// quantity is zero or negative are dropped; the order itself is kept even
/// when it ends up with no lines. Stock is not adjusted.
///
/// Every line total and the order total must fit in `Money`. The order is
/// left untouched if any edit is rejected.
pub fn apply_edits(order: &mut Order, edits: &[LineEdit]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut changes = Vec::with_capacity(edits.len());

    for edit in edits {
        if order.item(edit.order_item_id).is_none() {
            continue;
        }
        if edit.unit_price.is_negative() {
            errors.push(ValidationError::NegativePrice {
                order_item_id: edit.order_item_id,
                unit_price: edit.unit_price,
            });
            continue;
        }
        let quantity = if edit.quantity <= 0 {
            0
        } else {
            match u32::try_from(edit.quantity) {
                Ok(quantity) => quantity,
                Err(_) => {
                    errors.push(ValidationError::InvalidLineQuantity {
                        order_item_id: edit.order_item_id,
                        quantity: edit.quantity,
                    });
                    continue;
                }
            }
        };
        changes.push((edit.order_item_id, quantity, edit.unit_price));
    }

    errors.into_result()?;

    let mut edited = order.clone();
    for (id, quantity, unit_price) in changes {
        if let Some(item) = edited.items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
            item.unit_price = unit_price;
        }
    }
    edited.items.retain(|item| item.quantity > 0);

    let mut errors = ValidationErrors::new();
    for item in &edited.items {
        if item.unit_price.checked_multiply(item.quantity).is_none() {
            errors.push(ValidationError::LineTotalOverflow {
                order_item_id: item.id,
            });
        }
    }
    if errors.is_empty() && edited.checked_total().is_none() {
        errors.push(ValidationError::OrderTotalOverflow);
    }
    errors.into_result()?;

    *order = edited;
    Ok(())
}
