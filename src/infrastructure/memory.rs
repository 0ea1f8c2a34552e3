//! In-memory adapters for the domain ports.
//!
//! One [`InMemoryStore`] backs carts, orders and payments so that placing an
//! order and emptying the cart happen under a single lock, mirroring the
//! single database transaction of the Diesel adapters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::catalog::ProductPricing;
use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::order::{CartCheckout, NewOrder, Order, OrderLine, OrderStatus, Page};
use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::domain::ports::{CartRepository, CatalogOracle, OrderRepository, PaymentRepository};

#[derive(Default)]
struct State {
    carts: HashMap<Uuid, Cart>,
    orders: Vec<Order>,
    payments: Vec<Payment>,
    events: Vec<OrderEvent>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("store lock poisoned".to_string()))
    }

    /// Outbox events recorded so far, oldest first.
    pub fn events(&self) -> Result<Vec<OrderEvent>, DomainError> {
        Ok(self.lock()?.events.clone())
    }

    pub fn order_count(&self) -> Result<usize, DomainError> {
        Ok(self.lock()?.orders.len())
    }
}

impl CartRepository for InMemoryStore {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, DomainError> {
        let state = self.lock()?;
        Ok(state.carts.values().find(|c| c.user_id == user_id).cloned())
    }

    fn save(&self, mut cart: Cart) -> Result<Cart, DomainError> {
        let mut state = self.lock()?;
        match state.carts.get(&cart.id) {
            Some(stored) if stored.version != cart.version => return Err(DomainError::CartChanged),
            Some(_) => {}
            None => {
                if state.carts.values().any(|c| c.user_id == cart.user_id) {
                    return Err(DomainError::CartChanged);
                }
            }
        }
        cart.version += 1;
        cart.updated_at = Utc::now();
        state.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }
}

impl OrderRepository for InMemoryStore {
    fn place_order(&self, order: NewOrder, checkout: CartCheckout) -> Result<Order, DomainError> {
        let mut state = self.lock()?;
        let cart = state
            .carts
            .get_mut(&checkout.cart_id)
            .filter(|c| c.version == checkout.version)
            .ok_or(DomainError::CartChanged)?;
        cart.lines.clear();
        cart.version += 1;
        cart.updated_at = Utc::now();

        let now = Utc::now();
        let placed = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            lines: order
                .lines
                .into_iter()
                .map(|l| OrderLine {
                    id: Uuid::new_v4(),
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
            shipping_address_id: order.shipping_address_id,
            billing_address_id: order.billing_address_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: order.total_amount,
            created_at: now,
            updated_at: now,
        };
        state.orders.push(placed.clone());
        state.events.push(OrderEvent::Placed(placed.clone()));
        Ok(placed)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let state = self.lock()?;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    fn find_by_id_and_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == id && o.user_id == user_id)
            .cloned())
    }

    fn find_by_user_paged(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Page<Order>, DomainError> {
        let state = self.lock()?;
        // Insertion order breaks ties between equal timestamps.
        let mut owned: Vec<(usize, &Order)> = state
            .orders
            .iter()
            .enumerate()
            .filter(|(_, o)| o.user_id == user_id)
            .collect();
        owned.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));

        let offset = usize::try_from(Page::<Order>::offset(page, limit)?).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(Page {
            total: owned.len() as i64,
            items: owned
                .into_iter()
                .skip(offset)
                .take(take)
                .map(|(_, o)| o.clone())
                .collect(),
            page,
            limit,
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let mut state = self.lock()?;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DomainError::OrderNotFound)?;
        if order.status != expected {
            return Err(DomainError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        order.updated_at = Utc::now();
        let updated = order.clone();
        state.events.push(OrderEvent::StatusChanged {
            order_id: updated.id,
            user_id: updated.user_id,
            from: expected,
            to: status,
        });
        Ok(updated)
    }
}

impl PaymentRepository for InMemoryStore {
    fn create(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let created = Payment {
            id: Uuid::new_v4(),
            order_id: payment.order_id,
            payment_method: payment.payment_method,
            payment_status: PaymentStatus::Pending,
            amount: payment.amount,
            transaction_id: payment.transaction_id,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        state.payments.push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError> {
        let state = self.lock()?;
        Ok(state.payments.iter().find(|p| p.id == id).cloned())
    }

    fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }

    fn update_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        failure_reason: Option<String>,
    ) -> Result<Option<Payment>, DomainError> {
        let mut state = self.lock()?;
        let Some(payment) = state.payments.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        payment.payment_status = status;
        payment.failure_reason = failure_reason;
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }
}

/// Catalog keyed by `(product_id, variant_id)`.
#[derive(Default)]
pub struct InMemoryCatalog {
    entries: Mutex<HashMap<(Uuid, Option<Uuid>), ProductPricing>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        pricing: ProductPricing,
    ) -> Result<(), DomainError> {
        self.lock()?.insert((product_id, variant_id), pricing);
        Ok(())
    }

    pub fn remove(&self, product_id: Uuid, variant_id: Option<Uuid>) -> Result<(), DomainError> {
        self.lock()?.remove(&(product_id, variant_id));
        Ok(())
    }

    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<(Uuid, Option<Uuid>), ProductPricing>>, DomainError> {
        self.entries
            .lock()
            .map_err(|_| DomainError::Internal("catalog lock poisoned".to_string()))
    }
}

impl CatalogOracle for InMemoryCatalog {
    fn validate_and_get_pricing(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<ProductPricing, DomainError> {
        self.lock()?
            .get(&(product_id, variant_id))
            .cloned()
            .ok_or_else(|| DomainError::ProductInvalid(product_id.to_string()))
    }
}
