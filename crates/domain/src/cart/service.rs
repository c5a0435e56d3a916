//! Session-backed cart operations.

use common::{ProductId, SessionId};
use store::{Catalog, SessionStore, SessionStoreExt};

use super::Cart;
use crate::error::DomainError;

/// Session key the cart is stored under.
pub const CART_KEY: &str = "CART";

/// Service for the per-session shopping cart.
///
/// Every mutation loads the cart from the session, changes it and writes it
/// back. The order store is never touched.
pub struct CartService<C: Catalog, SS: SessionStore> {
    catalog: C,
    sessions: SS,
}

impl<C: Catalog, SS: SessionStore> CartService<C, SS> {
    pub fn new(catalog: C, sessions: SS) -> Self {
        Self { catalog, sessions }
    }

    /// Returns the current cart, empty if the session has none.
    pub async fn view(&self, session: SessionId) -> Result<Cart, DomainError> {
        let cart: Option<Cart> = self.sessions.get_object(session, CART_KEY).await?;
        Ok(cart.unwrap_or_default())
    }

    /// Adds a product; the quantity defaults to 1 and is clamped to at least 1.
    #[tracing::instrument(skip(self))]
    pub async fn add(
        &self,
        session: SessionId,
        product_id: ProductId,
        quantity: Option<i64>,
    ) -> Result<Cart, DomainError> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::product_not_found(product_id))?;

        let mut cart = self.view(session).await?;
        cart.add(&product, quantity.unwrap_or(1));
        self.save(session, &cart).await?;

        tracing::debug!(%session, %product_id, "product added to cart");
        Ok(cart)
    }

    /// Sets a line's quantity, removing it when `quantity <= 0`.
    ///
    /// A product that is not in the cart leaves the session untouched.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        session: SessionId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, DomainError> {
        let mut cart = self.view(session).await?;
        if cart.update(product_id, quantity) {
            self.save(session, &cart).await?;
        }
        Ok(cart)
    }

    /// Removes every line for the product.
    #[tracing::instrument(skip(self))]
    pub async fn remove(
        &self,
        session: SessionId,
        product_id: ProductId,
    ) -> Result<Cart, DomainError> {
        let mut cart = self.view(session).await?;
        cart.remove(product_id);
        self.save(session, &cart).await?;
        Ok(cart)
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, session: SessionId) -> Result<Cart, DomainError> {
        self.sessions.remove(session, CART_KEY).await?;
        Ok(Cart::new())
    }

    async fn save(&self, session: SessionId, cart: &Cart) -> Result<(), DomainError> {
        self.sessions.set_object(session, CART_KEY, cart).await?;
        Ok(())
    }
}
