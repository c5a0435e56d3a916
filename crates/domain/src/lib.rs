//! Domain layer for the shop.
//!
//! - `cart`: the per-session shopping cart
//! - `checkout`: stock-checked order placement
//! - `order`: listing, editing and deleting placed orders

pub mod cart;
pub mod checkout;
pub mod error;
pub mod order;

pub use cart::{CART_KEY, Cart, CartLine, CartService};
pub use checkout::{CheckoutService, SelectableProduct, Selection};
pub use error::{DomainError, ValidationError, ValidationErrors};
pub use order::{
    EditableLine, LineEdit, OrderDetails, OrderEditForm, OrderLine, OrderService, apply_edits,
};
