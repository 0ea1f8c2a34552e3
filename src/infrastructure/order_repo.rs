use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::{OrderEvent, ORDER_AGGREGATE};
use crate::domain::order::{CartCheckout, NewOrder, Order, OrderStatus, Page};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::OrderRepository;
use crate::schema::{cart_lines, carts, commerce_order_outbox, order_lines, orders};

use super::models::{NewOrderLineRow, NewOrderRow, NewOutboxEventRow, OrderLineRow, OrderRow};

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_lines(conn: &mut PgConnection, order: OrderRow) -> Result<Order, DomainError> {
    let lines: Vec<OrderLineRow> = OrderLineRow::belonging_to(&order)
        .select(OrderLineRow::as_select())
        .order(order_lines::position.asc())
        .load(conn)?;
    order.into_domain(lines)
}

fn record_event(conn: &mut PgConnection, event: &OrderEvent) -> Result<(), DomainError> {
    // Debezium's EventRouter SMT derives the Kafka topic from `aggregate_type`.
    diesel::insert_into(commerce_order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: ORDER_AGGREGATE.to_string(),
            aggregate_id: event.aggregate_id().to_string(),
            event_type: event.event_type().to_string(),
            payload: event.payload(),
        })
        .execute(conn)?;
    Ok(())
}

impl OrderRepository for DieselOrderRepository {
    fn place_order(&self, order: NewOrder, checkout: CartCheckout) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Claim the cart version that was validated. A concurrent
            //    checkout or cart edit makes this match zero rows.
            let claimed = diesel::update(
                carts::table
                    .filter(carts::id.eq(checkout.cart_id))
                    .filter(carts::version.eq(checkout.version)),
            )
            .set((
                carts::version.eq(checkout.version + 1),
                carts::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
            if claimed == 0 {
                return Err(DomainError::CartChanged);
            }

            // 2. Empty the cart, keeping the cart row.
            diesel::delete(cart_lines::table.filter(cart_lines::cart_id.eq(checkout.cart_id)))
                .execute(conn)?;

            // 3. Insert the order
            let order_id = Uuid::new_v4();
            let row: OrderRow = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id: order.user_id,
                    shipping_address_id: order.shipping_address_id,
                    billing_address_id: order.billing_address_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    total_amount: order.total_amount,
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // 4. Insert order lines
            let new_lines: Vec<NewOrderLineRow> = order
                .lines
                .into_iter()
                .zip(0..)
                .map(|(l, position)| NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id,
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
                    position,
                })
                .collect();
            let lines: Vec<OrderLineRow> = diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .returning(OrderLineRow::as_returning())
                .get_results(conn)?;

            let placed = row.into_domain(lines)?;

            // 5. Outbox event in the same transaction.
            record_event(conn, &OrderEvent::Placed(placed.clone()))?;

            Ok(placed)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order: Option<OrderRow> = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };
        load_lines(&mut conn, order).map(Some)
    }

    fn find_by_id_and_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order: Option<OrderRow> = orders::table
            .filter(orders::id.eq(id))
            .filter(orders::user_id.eq(user_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };
        load_lines(&mut conn, order).map(Some)
    }

    fn find_by_user_paged(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Page<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = Page::<Order>::offset(page, limit)?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table
                .filter(orders::user_id.eq(user_id))
                .count()
                .get_result(conn)?;

            let rows: Vec<OrderRow> = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order((orders::created_at.desc(), orders::id.desc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            // All lines for the page in one query.
            let lines: Vec<OrderLineRow> = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .order(order_lines::position.asc())
                .load(conn)?;

            let items = lines
                .grouped_by(&rows)
                .into_iter()
                .zip(rows)
                .map(|(lines, order)| order.into_domain(lines))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page {
                items,
                total,
                page,
                limit,
            })
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row: Option<OrderRow> = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::status.eq(expected.as_str())),
            )
            .set((
                orders::status.eq(status.as_str()),
                orders::updated_at.eq(Utc::now()),
            ))
            .returning(OrderRow::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(row) = row else {
                // Either gone or moved on since it was read.
                let current: Option<String> = orders::table
                    .filter(orders::id.eq(id))
                    .select(orders::status)
                    .first(conn)
                    .optional()?;
                return Err(match current {
                    None => DomainError::OrderNotFound,
                    Some(current) => DomainError::InvalidTransition {
                        from: current.parse()?,
                        to: status,
                    },
                });
            };

            record_event(
                conn,
                &OrderEvent::StatusChanged {
                    order_id: row.id,
                    user_id: row.user_id,
                    from: expected,
                    to: status,
                },
            )?;
            load_lines(conn, row)
        })
    }
}
