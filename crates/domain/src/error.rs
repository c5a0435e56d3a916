//! Domain error types.

use common::{Money, OrderId, OrderItemId, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during cart, checkout and order operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced product, order or line does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request failed one or more business rules.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The atomic checkout write failed and was rolled back.
    #[error("Checkout transaction failed: {0}")]
    Transaction(#[source] StoreError),

    /// The order changed between load and save.
    #[error("Order {order_id} was modified concurrently")]
    ConcurrencyConflict { order_id: OrderId },

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn product_not_found(id: ProductId) -> Self {
        DomainError::NotFound {
            entity: "Product",
            id: id.to_string(),
        }
    }

    pub fn order_not_found(id: OrderId) -> Self {
        DomainError::NotFound {
            entity: "Order",
            id: id.to_string(),
        }
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Validation(errors)
    }
}

impl From<ValidationError> for DomainError {
    fn from(error: ValidationError) -> Self {
        DomainError::Validation(ValidationErrors::from(error))
    }
}

/// A single business-rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no items selected")]
    NoItemsSelected,

    #[error("invalid quantity {quantity} for product {product_id}: must be a positive whole number")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    #[error("insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: u32,
        requested: u32,
    },

    #[error("invalid quantity {quantity} for order line {order_item_id}")]
    InvalidLineQuantity {
        order_item_id: OrderItemId,
        quantity: i64,
    },

    #[error("unit price {unit_price} for order line {order_item_id} must not be negative")]
    NegativePrice {
        order_item_id: OrderItemId,
        unit_price: Money,
    },

    #[error("line total for order line {order_item_id} exceeds the largest representable amount")]
    LineTotalOverflow { order_item_id: OrderItemId },

    #[error("order total exceeds the largest representable amount")]
    OrderTotalOverflow,
}

/// Every violation found while validating one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Human-readable messages, in the order the violations were found.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// Returns `Err(self)` if any violation was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}
