use thiserror::Error;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Cart not found")]
    CartNotFound,
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Cart item not found")]
    CartItemNotFound,
    /// Raised by the catalog when a product or variant does not exist.
    #[error("Product not available: {0}")]
    ProductInvalid(String),
    #[error("Product validation failed for {product}: {reason}")]
    ProductValidationFailed { product: String, reason: String },
    /// Also returned when the order exists but belongs to another user.
    #[error("Order not found")]
    OrderNotFound,
    #[error("Payment not found")]
    PaymentNotFound,
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Cart was modified concurrently")]
    CartChanged,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation_failed(product: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::ProductValidationFailed {
            product: product.into(),
            reason: reason.into(),
        }
    }
}
