use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::domain::ports::PaymentRepository;
use crate::schema::payments;

use super::models::{NewPaymentRow, PaymentRow};

pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PaymentRepository for DieselPaymentRepository {
    fn create(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        let mut conn = self.pool.get()?;

        let row: PaymentRow = diesel::insert_into(payments::table)
            .values(&NewPaymentRow {
                id: Uuid::new_v4(),
                order_id: payment.order_id,
                payment_method: payment.payment_method.as_str().to_string(),
                payment_status: PaymentStatus::Pending.as_str().to_string(),
                amount: payment.amount,
                transaction_id: payment.transaction_id,
            })
            .returning(PaymentRow::as_returning())
            .get_result(&mut conn)?;

        row.try_into()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError> {
        let mut conn = self.pool.get()?;

        let row: Option<PaymentRow> = payments::table
            .find(id)
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(Payment::try_from).transpose()
    }

    fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<PaymentRow> = payments::table
            .filter(payments::order_id.eq(order_id))
            .order(payments::created_at.asc())
            .select(PaymentRow::as_select())
            .load(&mut conn)?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    fn update_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        failure_reason: Option<String>,
    ) -> Result<Option<Payment>, DomainError> {
        let mut conn = self.pool.get()?;

        let row: Option<PaymentRow> = diesel::update(payments::table.find(id))
            .set((
                payments::payment_status.eq(status.as_str()),
                payments::failure_reason.eq(failure_reason),
                payments::updated_at.eq(Utc::now()),
            ))
            .returning(PaymentRow::as_returning())
            .get_result(&mut conn)
            .optional()?;

        row.map(Payment::try_from).transpose()
    }
}
