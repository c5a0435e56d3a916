pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod session;
pub mod store;

pub use common::{Money, OrderId, OrderItemId, ProductId, SessionId};
pub use error::{Result, StoreError};
pub use memory::InMemoryShopStore;
pub use model::{NewOrder, NewOrderItem, NewProduct, Order, OrderItem, Product};
pub use postgres::PostgresShopStore;
pub use session::{InMemorySessionStore, SessionStore, SessionStoreExt};
pub use store::{Catalog, OrderStore, ShopStore};
