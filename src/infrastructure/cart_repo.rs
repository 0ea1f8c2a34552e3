use std::collections::HashMap;

use chrono::Utc;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{Cart, CartLine};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_lines, carts};

use super::models::{CartChangeset, CartLineRow, CartRow, NewCartLineRow, NewCartRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Makes the stored lines of `cart_id` equal to `lines`: rows whose
/// product/variant disappeared are deleted, changed rows updated, new ones
/// inserted. Untouched rows keep their ids.
fn sync_lines(conn: &mut PgConnection, cart_id: Uuid, lines: &[CartLine]) -> Result<(), DomainError> {
    let stored: Vec<CartLineRow> = cart_lines::table
        .filter(cart_lines::cart_id.eq(cart_id))
        .select(CartLineRow::as_select())
        .load(conn)?;
    let mut stored: HashMap<(Uuid, Option<Uuid>), CartLineRow> = stored
        .into_iter()
        .map(|row| ((row.product_id, row.variant_id), row))
        .collect();

    let mut inserts = Vec::new();
    for (line, position) in lines.iter().zip(0..) {
        match stored.remove(&(line.product_id, line.variant_id)) {
            Some(row) => {
                let unchanged = row.quantity == line.quantity
                    && row.unit_price == line.unit_price
                    && row.position == position;
                if !unchanged {
                    diesel::update(cart_lines::table.find(row.id))
                        .set((
                            cart_lines::quantity.eq(line.quantity),
                            cart_lines::unit_price.eq(&line.unit_price),
                            cart_lines::position.eq(position),
                        ))
                        .execute(conn)?;
                }
            }
            None => inserts.push(NewCartLineRow {
                id: Uuid::new_v4(),
                cart_id,
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                unit_price: line.unit_price.clone(),
                position,
            }),
        }
    }

    // Whatever is left was removed from the cart.
    let removed: Vec<Uuid> = stored.into_values().map(|row| row.id).collect();
    if !removed.is_empty() {
        diesel::delete(cart_lines::table.filter(cart_lines::id.eq_any(&removed)))
            .execute(conn)?;
    }
    if !inserts.is_empty() {
        diesel::insert_into(cart_lines::table)
            .values(&inserts)
            .execute(conn)?;
    }
    Ok(())
}

impl CartRepository for DieselCartRepository {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, DomainError> {
        let mut conn = self.pool.get()?;

        let cart: Option<CartRow> = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(cart) = cart else {
            return Ok(None);
        };

        let lines: Vec<CartLineRow> = CartLineRow::belonging_to(&cart)
            .select(CartLineRow::as_select())
            .order(cart_lines::position.asc())
            .load(&mut conn)?;

        Ok(Some(cart.into_domain(lines)))
    }

    fn save(&self, cart: Cart) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let now = Utc::now();
            let version = cart.version + 1;

            let updated = diesel::update(
                carts::table
                    .filter(carts::id.eq(cart.id))
                    .filter(carts::version.eq(cart.version)),
            )
            .set(&CartChangeset {
                shipping_address_id: cart.shipping_address_id,
                billing_address_id: cart.billing_address_id,
                version,
                updated_at: now,
            })
            .execute(conn)?;

            if updated == 0 {
                let known: bool =
                    diesel::select(exists(carts::table.filter(carts::id.eq(cart.id)))).get_result(conn)?;
                if known {
                    return Err(DomainError::CartChanged);
                }
                diesel::insert_into(carts::table)
                    .values(&NewCartRow {
                        id: cart.id,
                        user_id: cart.user_id,
                        shipping_address_id: cart.shipping_address_id,
                        billing_address_id: cart.billing_address_id,
                        version,
                        created_at: cart.created_at,
                        updated_at: now,
                    })
                    .execute(conn)
                    .map_err(|e| match e {
                        // Another request created this user's cart first.
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            DomainError::CartChanged
                        }
                        other => other.into(),
                    })?;
            }

            sync_lines(conn, cart.id, &cart.lines)?;

            Ok(Cart {
                version,
                updated_at: now,
                ..cart
            })
        })
    }
}
