//! Session-scoped shopping cart.

mod aggregate;
mod service;

pub use aggregate::{Cart, CartLine};
pub use service::{CART_KEY, CartService};
