use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    /// Catalog price seen when the line was added. Informational only.
    pub unit_price: Option<BigDecimal>,
}

impl CartLine {
    pub fn matches(&self, product_id: Uuid, variant_id: Option<Uuid>) -> bool {
        self.product_id == product_id && self.variant_id == variant_id
    }
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lines: Vec<CartLine>,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    /// Version of the persisted row; 0 for a cart that was never saved.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Cart {
            id: Uuid::new_v4(),
            user_id,
            lines: Vec::new(),
            shipping_address_id: None,
            billing_address_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: Uuid, variant_id: Option<Uuid>) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(product_id, variant_id))
    }

    /// Quantity already in the cart for this product/variant, 0 if absent.
    pub fn quantity_of(&self, product_id: Uuid, variant_id: Option<Uuid>) -> i32 {
        self.line(product_id, variant_id).map_or(0, |l| l.quantity)
    }

    /// Adds a line, merging into an existing line for the same
    /// product/variant by summing quantities.
    pub fn add_line(
        &mut self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
        unit_price: Option<BigDecimal>,
    ) -> Result<(), DomainError> {
        ensure_positive(quantity)?;
        match self.lines.iter_mut().find(|l| l.matches(product_id, variant_id)) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::InvalidInput("quantity too large".to_string()))?;
                if unit_price.is_some() {
                    existing.unit_price = unit_price;
                }
            }
            None => self.lines.push(CartLine {
                product_id,
                variant_id,
                quantity,
                unit_price,
            }),
        }
        self.touch();
        Ok(())
    }

    pub fn set_quantity(
        &mut self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<(), DomainError> {
        ensure_positive(quantity)?;
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.matches(product_id, variant_id))
            .ok_or(DomainError::CartItemNotFound)?;
        line.quantity = quantity;
        self.touch();
        Ok(())
    }

    pub fn remove_line(
        &mut self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(product_id, variant_id));
        if self.lines.len() == before {
            return Err(DomainError::CartItemNotFound);
        }
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.touch();
    }

    pub fn set_addresses(&mut self, shipping: Option<Uuid>, billing: Option<Uuid>) {
        self.shipping_address_id = shipping;
        self.billing_address_id = billing;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn ensure_positive(quantity: i32) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::InvalidInput(format!(
            "quantity must be at least 1, got {}",
            quantity
        )));
    }
    Ok(())
}
