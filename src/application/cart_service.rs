use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CatalogOracle};

pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogOracle>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, catalog: Arc<dyn CatalogOracle>) -> Self {
        Self { carts, catalog }
    }

    pub fn get_cart(&self, user_id: Uuid) -> Result<Cart, DomainError> {
        self.carts
            .find_by_user(user_id)?
            .ok_or(DomainError::CartNotFound)
    }

    /// Creates the cart on first use. The product must be active and have
    /// stock for the merged quantity.
    pub fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<Cart, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidInput(format!(
                "quantity must be at least 1, got {}",
                quantity
            )));
        }

        let pricing = match self.catalog.validate_and_get_pricing(product_id, variant_id) {
            Ok(pricing) => pricing,
            Err(DomainError::ProductInvalid(product)) => {
                return Err(DomainError::validation_failed(product, "product does not exist"))
            }
            Err(e) => return Err(e),
        };
        if !pricing.is_active {
            return Err(DomainError::validation_failed(
                pricing.display_name(),
                "product is not available",
            ));
        }

        let mut cart = match self.carts.find_by_user(user_id)? {
            Some(cart) => cart,
            None => {
                info!("Creating cart for user {}", user_id);
                Cart::new(user_id)
            }
        };

        let wanted = cart
            .quantity_of(product_id, variant_id)
            .saturating_add(quantity);
        if !pricing.has_stock_for(wanted) {
            warn!(
                "Rejected {} x{} for user {}: only {} in stock",
                pricing.sku, wanted, user_id, pricing.available_stock
            );
            return Err(DomainError::validation_failed(
                pricing.display_name(),
                format!(
                    "insufficient stock: requested {}, available {}",
                    wanted, pricing.available_stock
                ),
            ));
        }

        cart.add_line(product_id, variant_id, quantity, Some(pricing.unit_price))?;
        self.carts.save(cart)
    }

    pub fn update_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<Cart, DomainError> {
        let mut cart = self.get_cart(user_id)?;
        cart.set_quantity(product_id, variant_id, quantity)?;

        let in_stock = match self
            .catalog
            .has_sufficient_stock(product_id, variant_id, quantity)
        {
            Ok(in_stock) => in_stock,
            Err(DomainError::ProductInvalid(product)) => {
                return Err(DomainError::validation_failed(product, "product does not exist"))
            }
            Err(e) => return Err(e),
        };
        if !in_stock {
            return Err(DomainError::validation_failed(
                product_id.to_string(),
                format!("insufficient stock for quantity {}", quantity),
            ));
        }

        self.carts.save(cart)
    }

    pub fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<Cart, DomainError> {
        let mut cart = self.get_cart(user_id)?;
        cart.remove_line(product_id, variant_id)?;
        self.carts.save(cart)
    }

    pub fn clear_cart(&self, user_id: Uuid) -> Result<Cart, DomainError> {
        let mut cart = self.get_cart(user_id)?;
        cart.clear();
        self.carts.save(cart)
    }

    /// Checkout addresses remembered on the cart. Ids only; the addresses
    /// themselves live elsewhere.
    pub fn set_addresses(
        &self,
        user_id: Uuid,
        shipping_address_id: Option<Uuid>,
        billing_address_id: Option<Uuid>,
    ) -> Result<Cart, DomainError> {
        let mut cart = self.get_cart(user_id)?;
        cart.set_addresses(shipping_address_id, billing_address_id);
        self.carts.save(cart)
    }
}
