//! HTTP handlers and the state they share.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;

use domain::{CartService, CheckoutService, OrderService};
use store::{InMemorySessionStore, ShopStore};

/// Shared application state accessible from all handlers.
pub struct AppState<S: ShopStore> {
    pub cart_service: CartService<S, InMemorySessionStore>,
    pub checkout_service: CheckoutService<S>,
    pub order_service: OrderService<S>,
}
