use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderLine};
use crate::domain::payment::Payment;
use crate::schema::{
    cart_lines, carts, commerce_order_outbox, order_lines, orders, payments, product_variants,
    products,
};

// ── Catalog ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = product_variants)]
#[diesel(belongs_to(ProductRow, foreign_key = product_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductVariantRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub price: Option<BigDecimal>,
    pub stock: i32,
    pub active: bool,
}

// ── Carts ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = carts)]
#[diesel(treat_none_as_null = true)]
pub struct CartChangeset {
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = cart_lines)]
#[diesel(belongs_to(CartRow, foreign_key = cart_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartLineRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Option<BigDecimal>,
    pub position: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_lines)]
pub struct NewCartLineRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Option<BigDecimal>,
    pub position: i32,
}

impl CartRow {
    pub fn into_domain(self, lines: Vec<CartLineRow>) -> Cart {
        Cart {
            id: self.id,
            user_id: self.user_id,
            lines: lines
                .into_iter()
                .map(|l| CartLine {
                    product_id: l.product_id,
                    variant_id: l.variant_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
            shipping_address_id: self.shipping_address_id,
            billing_address_id: self.billing_address_id,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ── Orders ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub total_amount: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
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
    pub position: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
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
    pub position: i32,
}

impl OrderRow {
    pub fn into_domain(self, lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            lines: lines
                .into_iter()
                .map(|l| OrderLine {
                    id: l.id,
                    product_id: l.product_id,
                    variant_id: l.variant_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    discount_amount: l.discount_amount,
                    tax_amount: l.tax_amount,
                    total_price: l.total_price,
                    product_name: l.product_name,
                    variant_name: l.variant_name,
                    sku: l.sku,
                })
                .collect(),
            shipping_address_id: self.shipping_address_id,
            billing_address_id: self.billing_address_id,
            status: stored(&self.status)?,
            payment_status: stored(&self.payment_status)?,
            total_amount: self.total_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ── Payments ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_method: String,
    pub payment_status: String,
    pub amount: BigDecimal,
    pub transaction_id: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_method: String,
    pub payment_status: String,
    pub amount: BigDecimal,
    pub transaction_id: String,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            payment_method: stored(&row.payment_method)?,
            payment_status: stored(&row.payment_status)?,
            amount: row.amount,
            transaction_id: row.transaction_id,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ── Outbox ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = commerce_order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = commerce_order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

/// Parses an enum column. A value the domain does not know means the row was
/// written by something else, so it is an internal error rather than bad input.
fn stored<T>(value: &str) -> Result<T, DomainError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    value
        .parse()
        .map_err(|_| DomainError::Internal(format!("unexpected stored value '{}'", value)))
}
