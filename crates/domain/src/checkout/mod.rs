//! Order placement with stock validation.

mod service;
mod validation;

pub use service::{CheckoutService, SelectableProduct};
pub use validation::{Selection, plan_order_items, selected};
