use uuid::Uuid;

use super::cart::Cart;
use super::catalog::ProductPricing;
use super::errors::DomainError;
use super::order::{CartCheckout, NewOrder, Order, OrderStatus, Page};
use super::payment::{NewPayment, Payment, PaymentStatus};

pub trait CatalogOracle: Send + Sync + 'static {
    /// Fails with [`DomainError::ProductInvalid`] when the product, or the
    /// given variant of it, does not exist. Inactive products are returned
    /// with `is_active == false`.
    fn validate_and_get_pricing(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<ProductPricing, DomainError>;

    fn has_sufficient_stock(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<bool, DomainError> {
        let pricing = self.validate_and_get_pricing(product_id, variant_id)?;
        Ok(pricing.is_active && pricing.has_stock_for(quantity))
    }
}

pub trait CartRepository: Send + Sync + 'static {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, DomainError>;
    /// Persists the cart and its full line collection, returning the saved
    /// cart with its new version. Fails with [`DomainError::CartChanged`]
    /// when the stored version differs from `cart.version`.
    fn save(&self, cart: Cart) -> Result<Cart, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Persists the order and empties the consumed cart atomically. Fails
    /// with [`DomainError::CartChanged`] without writing anything when the
    /// cart is no longer at `checkout.version`.
    fn place_order(&self, order: NewOrder, checkout: CartCheckout) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_by_id_and_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, DomainError>;
    /// Newest first. `page` is 1-based.
    fn find_by_user_paged(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Page<Order>, DomainError>;
    /// Compare-and-set on the status column: only updates when the stored
    /// status still equals `expected`.
    fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, DomainError>;
}

pub trait PaymentRepository: Send + Sync + 'static {
    fn create(&self, payment: NewPayment) -> Result<Payment, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError>;
    fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>, DomainError>;
    fn update_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        failure_reason: Option<String>,
    ) -> Result<Option<Payment>, DomainError>;
}
