use std::sync::Arc;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};
use crate::domain::errors::DomainError;
use crate::domain::order::{CartCheckout, NewOrder, NewOrderLine, Order, OrderStatus, Page};
use crate::domain::ports::{CartRepository, CatalogOracle, OrderRepository};
use crate::domain::status::TransitionPolicy;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Cart-to-order conversion and the order status lifecycle.
pub struct OrderService {
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogOracle>,
    policy: TransitionPolicy,
}

impl OrderService {
    pub fn new(
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogOracle>,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            carts,
            orders,
            catalog,
            policy,
        }
    }

    /// Turns the user's cart into a PENDING order priced from the catalog
    /// and empties the cart.
    ///
    /// Addresses not given here fall back to the ones stored on the cart.
    /// Every line is validated before anything is written; the first invalid
    /// line aborts the checkout and leaves the cart untouched.
    pub fn create_order_from_cart(
        &self,
        user_id: Uuid,
        shipping_address_id: Option<Uuid>,
        billing_address_id: Option<Uuid>,
    ) -> Result<Order, DomainError> {
        let cart = self
            .carts
            .find_by_user(user_id)?
            .ok_or(DomainError::CartNotFound)?;

        let shipping_address_id = shipping_address_id
            .or(cart.shipping_address_id)
            .ok_or_else(|| DomainError::InvalidInput("shipping address is required".to_string()))?;
        let billing_address_id = billing_address_id
            .or(cart.billing_address_id)
            .ok_or_else(|| DomainError::InvalidInput("billing address is required".to_string()))?;

        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let lines = self.price_lines(&cart)?;
        let order = NewOrder::new(user_id, shipping_address_id, billing_address_id, lines);
        let checkout = CartCheckout {
            cart_id: cart.id,
            version: cart.version,
        };

        let placed = self.orders.place_order(order, checkout)?;
        info!(
            "Order {} placed for user {} ({} lines, total {})",
            placed.id,
            user_id,
            placed.lines.len(),
            placed.total_amount
        );
        Ok(placed)
    }

    fn price_lines(&self, cart: &Cart) -> Result<Vec<NewOrderLine>, DomainError> {
        cart.lines
            .iter()
            .map(|line| self.price_line(line))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| warn!("Checkout rejected for cart {}: {}", cart.id, e))
    }

    fn price_line(&self, line: &CartLine) -> Result<NewOrderLine, DomainError> {
        let pricing = match self
            .catalog
            .validate_and_get_pricing(line.product_id, line.variant_id)
        {
            Ok(pricing) => pricing,
            Err(DomainError::ProductInvalid(product)) => {
                return Err(DomainError::validation_failed(product, "product no longer exists"))
            }
            Err(e) => return Err(e),
        };

        if !pricing.is_active {
            return Err(DomainError::validation_failed(
                pricing.display_name(),
                "product is no longer available",
            ));
        }
        if !pricing.has_stock_for(line.quantity) {
            return Err(DomainError::validation_failed(
                pricing.display_name(),
                format!(
                    "insufficient stock: requested {}, available {}",
                    line.quantity, pricing.available_stock
                ),
            ));
        }

        debug!(
            "Priced {} x{} at {}",
            pricing.sku, line.quantity, pricing.unit_price
        );
        Ok(NewOrderLine::priced(line, pricing))
    }

    pub fn get_order_by_id(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, DomainError> {
        self.orders
            .find_by_id_and_user(order_id, user_id)?
            .ok_or(DomainError::OrderNotFound)
    }

    /// Newest first. `page` is 1-based; `limit` is clamped to 1..=100.
    pub fn get_user_orders(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Page<Order>, DomainError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        Page::<Order>::offset(page, limit)?;
        self.orders.find_by_user_paged(user_id, page, limit)
    }

    pub fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, DomainError> {
        let order = self.get_order_by_id(order_id, user_id)?;
        self.transition(order, OrderStatus::Cancelled)
    }

    /// Administrative; not scoped to a user.
    pub fn update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let order = self
            .orders
            .find_by_id(order_id)?
            .ok_or(DomainError::OrderNotFound)?;
        self.transition(order, status)
    }

    fn transition(&self, order: Order, status: OrderStatus) -> Result<Order, DomainError> {
        self.policy.check(order.status, status)?;
        let updated = self.orders.update_status(order.id, order.status, status)?;
        info!("Order {} moved from {} to {}", order.id, order.status, status);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::catalog::ProductPricing;
    use crate::domain::events::OrderEvent;
    use crate::domain::payment::PaymentStatus;
    use crate::infrastructure::memory::{InMemoryCatalog, InMemoryStore};

    struct Fixture {
        store: Arc<InMemoryStore>,
        catalog: Arc<InMemoryCatalog>,
        service: OrderService,
    }

    fn fixture_with(policy: TransitionPolicy) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let service = OrderService::new(store.clone(), store.clone(), catalog.clone(), policy);
        Fixture {
            store,
            catalog,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(TransitionPolicy::Strict)
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn pricing(name: &str, price: &str, stock: i32, active: bool) -> ProductPricing {
        ProductPricing {
            product_name: name.to_string(),
            variant_name: None,
            sku: name.to_uppercase(),
            unit_price: dec(price),
            available_stock: stock,
            is_active: active,
        }
    }

    impl Fixture {
        fn product(&self, name: &str, price: &str, stock: i32, active: bool) -> Uuid {
            let id = Uuid::new_v4();
            self.catalog
                .put(id, None, pricing(name, price, stock, active))
                .unwrap();
            id
        }

        /// Saves a cart with the given `(product, quantity, cached price)` lines.
        fn cart(&self, user: Uuid, lines: &[(Uuid, i32, Option<&str>)]) -> Cart {
            let mut cart = Cart::new(user);
            for (product, qty, cached) in lines {
                cart.add_line(*product, None, *qty, cached.map(dec)).unwrap();
            }
            self.store.save(cart).unwrap()
        }

        fn stored_cart(&self, user: Uuid) -> Cart {
            self.store.find_by_user(user).unwrap().expect("cart exists")
        }

        fn place(&self, user: Uuid) -> Order {
            let product = self.product("Mug", "8.00", 100, true);
            self.cart(user, &[(product, 1, None)]);
            self.service
                .create_order_from_cart(user, Some(Uuid::new_v4()), Some(Uuid::new_v4()))
                .unwrap()
        }

        fn force_status(&self, order: &Order, status: OrderStatus) {
            OrderRepository::update_status(&*self.store, order.id, order.status, status).unwrap();
        }
    }

    #[test]
    fn checkout_scenario_single_line() {
        let f = fixture();
        let user = Uuid::new_v4();
        let p1 = f.product("Kettle", "100.00", 10, true);
        f.cart(user, &[(p1, 2, None)]);
        let (a1, a2) = (Uuid::new_v4(), Uuid::new_v4());

        let order = f.service.create_order_from_cart(user, Some(a1), Some(a2)).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.total_amount, dec("200.00"));
        assert_eq!(order.shipping_address_id, a1);
        assert_eq!(order.billing_address_id, a2);
        assert_eq!(order.lines.len(), 1);
        let line = &order.lines[0];
        assert_eq!(line.product_id, p1);
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price, dec("100.00"));
        assert_eq!(line.total_price, dec("200.00"));
        assert_eq!(line.product_name, "Kettle");

        let cart = f.stored_cart(user);
        assert!(cart.is_empty(), "cart is cleared but kept");
    }

    #[test]
    fn checkout_uses_catalog_price_over_cached_cart_price() {
        let f = fixture();
        let user = Uuid::new_v4();
        let p1 = f.product("Lamp", "45.50", 10, true);
        let p2 = f.product("Bulb", "2.25", 10, true);
        f.cart(user, &[(p1, 1, Some("30.00")), (p2, 4, Some("9.99"))]);

        let order = f
            .service
            .create_order_from_cart(user, Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .unwrap();

        let prices: Vec<_> = order.lines.iter().map(|l| l.unit_price.clone()).collect();
        assert_eq!(prices, vec![dec("45.50"), dec("2.25")]);
        assert_eq!(order.total_amount, dec("54.50"));
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let f = fixture();
        let user = Uuid::new_v4();
        let lines: Vec<(Uuid, i32, Option<&str>)> = [("0.10", 3), ("19.99", 7), ("1000.00", 1)]
            .iter()
            .map(|(price, qty)| (f.product("Item", price, 50, true), *qty, None))
            .collect();
        f.cart(user, &lines);

        let order = f
            .service
            .create_order_from_cart(user, Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .unwrap();

        let sum = order
            .lines
            .iter()
            .fold(BigDecimal::from(0), |acc, l| acc + &l.total_price);
        assert_eq!(order.total_amount, sum);
        assert_eq!(order.total_amount, dec("1140.23"));
    }

    #[test]
    fn inactive_product_aborts_whole_checkout() {
        let f = fixture();
        let user = Uuid::new_v4();
        let good = f.product("Pen", "1.50", 10, true);
        let retired = f.product("Quill", "12.00", 10, false);
        let before = f.cart(user, &[(good, 2, None), (retired, 1, None)]);

        let err = f
            .service
            .create_order_from_cart(user, Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .unwrap_err();

        match err {
            DomainError::ProductValidationFailed { product, .. } => assert_eq!(product, "Quill"),
            other => panic!("unexpected error: {other:?}"),
        }
        let after = f.stored_cart(user);
        assert_eq!(after.lines, before.lines);
        assert_eq!(after.version, before.version);
        assert_eq!(f.store.order_count().unwrap(), 0);
        assert!(f.store.events().unwrap().is_empty());
    }

    #[test]
    fn insufficient_stock_aborts_checkout() {
        let f = fixture();
        let user = Uuid::new_v4();
        let scarce = f.product("Vase", "30.00", 1, true);
        f.cart(user, &[(scarce, 2, None)]);

        let err = f
            .service
            .create_order_from_cart(user, Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .unwrap_err();

        assert!(matches!(err, DomainError::ProductValidationFailed { .. }));
        assert!(err.to_string().contains("insufficient stock"));
        assert_eq!(f.stored_cart(user).lines.len(), 1);
        assert_eq!(f.store.order_count().unwrap(), 0);
    }

    #[test]
    fn product_removed_from_catalog_aborts_checkout() {
        let f = fixture();
        let user = Uuid::new_v4();
        let gone = f.product("Chair", "80.00", 3, true);
        f.cart(user, &[(gone, 1, None)]);
        f.catalog.remove(gone, None).unwrap();

        let err = f
            .service
            .create_order_from_cart(user, Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .unwrap_err();

        match err {
            DomainError::ProductValidationFailed { product, .. } => {
                assert_eq!(product, gone.to_string())
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn checkout_without_cart_fails() {
        let f = fixture();
        let err = f
            .service
            .create_order_from_cart(Uuid::new_v4(), Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, DomainError::CartNotFound));
    }

    #[test]
    fn checkout_of_empty_cart_fails() {
        let f = fixture();
        let user = Uuid::new_v4();
        f.cart(user, &[]);

        let err = f
            .service
            .create_order_from_cart(user, Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, DomainError::EmptyCart));
    }

    #[test]
    fn checkout_requires_addresses() {
        let f = fixture();
        let user = Uuid::new_v4();
        let p = f.product("Cup", "3.00", 5, true);
        f.cart(user, &[(p, 1, None)]);

        let err = f
            .service
            .create_order_from_cart(user, Some(Uuid::new_v4()), None)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(f.store.order_count().unwrap(), 0);
    }

    #[test]
    fn checkout_falls_back_to_cart_addresses() {
        let f = fixture();
        let user = Uuid::new_v4();
        let p = f.product("Cup", "3.00", 5, true);
        let mut cart = f.cart(user, &[(p, 1, None)]);
        let (ship, bill) = (Uuid::new_v4(), Uuid::new_v4());
        cart.set_addresses(Some(ship), Some(bill));
        f.store.save(cart).unwrap();

        let order = f.service.create_order_from_cart(user, None, None).unwrap();

        assert_eq!(order.shipping_address_id, ship);
        assert_eq!(order.billing_address_id, bill);
    }

    #[test]
    fn checkout_against_stale_cart_version_is_rejected() {
        let f = fixture();
        let user = Uuid::new_v4();
        let p = f.product("Cup", "3.00", 5, true);
        let cart = f.cart(user, &[(p, 1, None)]);

        // A concurrent checkout already consumed this version of the cart.
        let new_order = NewOrder::new(user, Uuid::new_v4(), Uuid::new_v4(), Vec::new());
        let checkout = CartCheckout {
            cart_id: cart.id,
            version: cart.version,
        };
        f.store.place_order(new_order.clone(), checkout).unwrap();

        let err = f.store.place_order(new_order, checkout).unwrap_err();
        assert!(matches!(err, DomainError::CartChanged));
        assert_eq!(f.store.order_count().unwrap(), 1);
    }

    #[test]
    fn checkout_emits_order_placed_event() {
        let f = fixture();
        let order = f.place(Uuid::new_v4());

        let events = f.store.events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "OrderPlaced");
        assert_eq!(events[0].aggregate_id(), order.id);
    }

    #[test]
    fn orders_are_isolated_per_user() {
        let f = fixture();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let order = f.place(bob);

        assert!(matches!(
            f.service.get_order_by_id(order.id, alice),
            Err(DomainError::OrderNotFound)
        ));
        assert!(matches!(
            f.service.cancel_order(order.id, alice),
            Err(DomainError::OrderNotFound)
        ));
        assert_eq!(f.service.get_order_by_id(order.id, bob).unwrap().id, order.id);
    }

    #[test]
    fn user_orders_are_paged_newest_first() {
        let f = fixture();
        let user = Uuid::new_v4();
        let ids: Vec<Uuid> = (0..3).map(|_| f.place(user).id).collect();
        f.place(Uuid::new_v4());

        let first = f.service.get_user_orders(user, 1, 2).unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(
            first.items.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![ids[2], ids[1]]
        );

        let second = f.service.get_user_orders(user, 2, 2).unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, ids[0]);
    }

    #[test]
    fn paging_arguments_are_clamped() {
        let f = fixture();
        let page = f.service.get_user_orders(Uuid::new_v4(), 0, 1000).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn huge_page_number_is_rejected() {
        let f = fixture();
        let user = Uuid::new_v4();
        f.place(user);

        assert!(matches!(
            f.service.get_user_orders(user, i64::MAX, MAX_PAGE_LIMIT),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn cancel_pending_order() {
        let f = fixture();
        let user = Uuid::new_v4();
        let order = f.place(user);

        let cancelled = f.service.cancel_order(order.id, user).unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        let events = f.store.events().unwrap();
        assert!(matches!(
            events.last(),
            Some(OrderEvent::StatusChanged {
                from: OrderStatus::Pending,
                to: OrderStatus::Cancelled,
                ..
            })
        ));
    }

    #[test]
    fn delivered_order_cannot_be_cancelled() {
        let f = fixture();
        let user = Uuid::new_v4();
        let order = f.place(user);
        f.force_status(&order, OrderStatus::Delivered);

        let err = f.service.cancel_order(order.id, user).unwrap_err();

        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(
            f.service.get_order_by_id(order.id, user).unwrap().status,
            OrderStatus::Delivered
        );
    }

    #[test]
    fn shipped_to_confirmed_is_rejected_under_both_policies() {
        for policy in [TransitionPolicy::Strict, TransitionPolicy::Lenient] {
            let f = fixture_with(policy);
            let order = f.place(Uuid::new_v4());
            f.force_status(&order, OrderStatus::Shipped);

            let err = f
                .service
                .update_order_status(order.id, OrderStatus::Confirmed)
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn terminal_orders_reject_every_target() {
        for policy in [TransitionPolicy::Strict, TransitionPolicy::Lenient] {
            for terminal in [OrderStatus::Cancelled, OrderStatus::Delivered] {
                let f = fixture_with(policy);
                let user = Uuid::new_v4();
                let order = f.place(user);
                f.force_status(&order, terminal);

                for target in OrderStatus::ALL {
                    assert!(matches!(
                        f.service.update_order_status(order.id, target),
                        Err(DomainError::InvalidTransition { .. })
                    ));
                }
                assert!(f.service.cancel_order(order.id, user).is_err());
                assert_eq!(
                    f.service.get_order_by_id(order.id, user).unwrap().status,
                    terminal
                );
            }
        }
    }

    #[test]
    fn full_lifecycle_under_strict_policy() {
        let f = fixture();
        let order = f.place(Uuid::new_v4());

        for next in [OrderStatus::Confirmed, OrderStatus::Shipped, OrderStatus::Delivered] {
            let updated = f.service.update_order_status(order.id, next).unwrap();
            assert_eq!(updated.status, next);
        }
    }

    #[test]
    fn strict_policy_rejects_skipping_states_lenient_accepts() {
        let strict = fixture();
        let order = strict.place(Uuid::new_v4());
        assert!(strict
            .service
            .update_order_status(order.id, OrderStatus::Delivered)
            .is_err());

        let lenient = fixture_with(TransitionPolicy::Lenient);
        let order = lenient.place(Uuid::new_v4());
        let delivered = lenient
            .service
            .update_order_status(order.id, OrderStatus::Delivered)
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
    }

    #[test]
    fn update_status_of_unknown_order_fails() {
        let f = fixture();
        assert!(matches!(
            f.service
                .update_order_status(Uuid::new_v4(), OrderStatus::Confirmed),
            Err(DomainError::OrderNotFound)
        ));
    }
}
