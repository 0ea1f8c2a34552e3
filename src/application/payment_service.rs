use std::sync::Arc;

use bigdecimal::BigDecimal;
use log::info;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::payment::{NewPayment, Payment, PaymentMethod, PaymentStatus};
use crate::domain::ports::{OrderRepository, PaymentRepository};

/// Payment records only; nothing here talks to a payment gateway.
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl PaymentService {
    pub fn new(payments: Arc<dyn PaymentRepository>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { payments, orders }
    }

    /// `amount` defaults to the order total.
    pub fn create_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        method: PaymentMethod,
        amount: Option<BigDecimal>,
    ) -> Result<Payment, DomainError> {
        let order = self
            .orders
            .find_by_id_and_user(order_id, user_id)?
            .ok_or(DomainError::OrderNotFound)?;

        let amount = amount.unwrap_or(order.total_amount);
        check_amount(&amount)?;

        let payment = self
            .payments
            .create(NewPayment::new(order.id, method, amount))?;
        info!(
            "Payment {} ({}) recorded for order {}",
            payment.id, payment.transaction_id, order.id
        );
        Ok(payment)
    }

    pub fn get_payment(&self, user_id: Uuid, payment_id: Uuid) -> Result<Payment, DomainError> {
        let payment = self
            .payments
            .find_by_id(payment_id)?
            .ok_or(DomainError::PaymentNotFound)?;
        // Payments of other users' orders are reported as missing.
        self.orders
            .find_by_id_and_user(payment.order_id, user_id)?
            .ok_or(DomainError::PaymentNotFound)?;
        Ok(payment)
    }

    pub fn get_payments_for_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<Payment>, DomainError> {
        self.orders
            .find_by_id_and_user(order_id, user_id)?
            .ok_or(DomainError::OrderNotFound)?;
        self.payments.find_by_order(order_id)
    }

    /// Administrative.
    pub fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        failure_reason: Option<String>,
    ) -> Result<Payment, DomainError> {
        let failure_reason = match status {
            PaymentStatus::Failed => failure_reason,
            _ => None,
        };
        self.payments
            .update_status(payment_id, status, failure_reason)?
            .ok_or(DomainError::PaymentNotFound)
    }
}

/// Amounts are stored as NUMERIC(14,2) and must be positive.
fn check_amount(amount: &BigDecimal) -> Result<(), DomainError> {
    if *amount <= BigDecimal::from(0) {
        return Err(DomainError::InvalidInput(
            "payment amount must be positive".to_string(),
        ));
    }
    if amount.with_scale(2) != *amount {
        return Err(DomainError::InvalidInput(format!(
            "payment amount {} has more than 2 decimal places",
            amount
        )));
    }
    if *amount >= BigDecimal::from(1_000_000_000_000i64) {
        return Err(DomainError::InvalidInput(format!(
            "payment amount {} is too large",
            amount
        )));
    }
    Ok(())
}
