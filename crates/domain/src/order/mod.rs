//! Placed orders: listing, details, line edits and deletion.

mod edit;
mod service;
mod views;

pub use edit::{LineEdit, apply_edits};
pub use service::OrderService;
pub use views::{EditableLine, OrderDetails, OrderEditForm, OrderLine};
