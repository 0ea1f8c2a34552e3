use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::cart::CartLine;
use super::catalog::ProductPricing;
use super::errors::DomainError;
use super::payment::PaymentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown order status '{}'", s)))
    }
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_price: BigDecimal,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A priced line that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_price: BigDecimal,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
}

impl NewOrderLine {
    /// Snapshots the catalog's current pricing for a cart line. Any price
    /// cached on the cart line is ignored.
    pub fn priced(line: &CartLine, pricing: ProductPricing) -> Self {
        let discount_amount = BigDecimal::from(0);
        let tax_amount = BigDecimal::from(0);
        let total_price = line_total(&pricing.unit_price, line.quantity, &discount_amount, &tax_amount);
        NewOrderLine {
            product_id: line.product_id,
            variant_id: line.variant_id,
            quantity: line.quantity,
            unit_price: pricing.unit_price,
            discount_amount,
            tax_amount,
            total_price,
            product_name: pricing.product_name,
            variant_name: pricing.variant_name,
            sku: pricing.sku,
        }
    }
}

/// `unit_price * quantity - discount + tax`
pub fn line_total(
    unit_price: &BigDecimal,
    quantity: i32,
    discount_amount: &BigDecimal,
    tax_amount: &BigDecimal,
) -> BigDecimal {
    unit_price * BigDecimal::from(quantity) - discount_amount + tax_amount
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub lines: Vec<NewOrderLine>,
    pub total_amount: BigDecimal,
}

impl NewOrder {
    pub fn new(
        user_id: Uuid,
        shipping_address_id: Uuid,
        billing_address_id: Uuid,
        lines: Vec<NewOrderLine>,
    ) -> Self {
        let total_amount = lines
            .iter()
            .fold(BigDecimal::from(0), |acc, l| acc + &l.total_price);
        NewOrder {
            user_id,
            shipping_address_id,
            billing_address_id,
            lines,
            total_amount,
        }
    }
}

/// The cart a new order consumes, identified by the version that was
/// validated. Placing the order empties exactly this version of the cart.
#[derive(Debug, Clone, Copy)]
pub struct CartCheckout {
    pub cart_id: Uuid,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    /// Row offset of a 1-based page. Pages past `i64::MAX` rows are rejected.
    pub fn offset(page: i64, limit: i64) -> Result<i64, DomainError> {
        page.checked_sub(1)
            .and_then(|p| p.checked_mul(limit))
            .filter(|offset| *offset >= 0)
            .ok_or_else(|| DomainError::InvalidInput(format!("page {} is out of range", page)))
    }
}
