pub mod cart_repo;
pub mod catalog_repo;
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod payment_repo;

use crate::domain::errors::DomainError;

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
