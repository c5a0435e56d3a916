//! Shared identifiers and value types used across the shop crates.

mod money;
mod types;

pub use money::Money;
pub use types::{OrderId, OrderItemId, ProductId, SessionId};
