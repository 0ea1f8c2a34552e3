use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::errors::AppError;
use crate::handlers::identity::{AdminUser, AuthenticatedUser};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    /// CREDIT_CARD, DEBIT_CARD, PAYPAL, BANK_TRANSFER or CASH_ON_DELIVERY.
    pub payment_method: String,
    /// Decimal string; defaults to the order total.
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    /// PENDING, COMPLETED, FAILED or REFUNDED.
    pub status: String,
    /// Kept only for FAILED.
    pub failure_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_method: String,
    pub payment_status: String,
    pub amount: String,
    pub transaction_id: String,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        PaymentResponse {
            id: p.id,
            order_id: p.order_id,
            payment_method: p.payment_method.to_string(),
            payment_status: p.payment_status.to_string(),
            amount: p.amount.to_string(),
            transaction_id: p.transaction_id,
            failure_reason: p.failure_reason,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// POST /payments
///
/// Records a PENDING payment against one of the caller's orders. No payment
/// gateway is contacted.
#[utoipa::path(
    post,
    path = "/payments",
    request_body = CreatePaymentRequest,
    params(("X-User-Id" = Uuid, Header, description = "Calling user")),
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 404, description = "Order not found"),
        (status = 422, description = "Unknown method or invalid amount"),
    ),
    tag = "payments"
)]
pub async fn create_payment(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let method: PaymentMethod = body.payment_method.parse()?;
    let amount = body
        .amount
        .as_deref()
        .map(|a| {
            BigDecimal::from_str(a)
                .map_err(|e| AppError::Unprocessable(format!("Invalid amount '{}': {}", a, e)))
        })
        .transpose()?;

    let payment = web::block(move || {
        state
            .payments
            .create_payment(user_id, body.order_id, method, amount)
    })
    .await??;

    Ok(HttpResponse::Created().json(PaymentResponse::from(payment)))
}

/// GET /payments/{id}
#[utoipa::path(
    get,
    path = "/payments/{id}",
    params(
        ("id" = Uuid, Path, description = "Payment UUID"),
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Payment found", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
    ),
    tag = "payments"
)]
pub async fn get_payment(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();

    let payment = web::block(move || state.payments.get_payment(user_id, payment_id)).await??;

    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}

/// GET /orders/{id}/payments
#[utoipa::path(
    get,
    path = "/orders/{id}/payments",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Payments of the order", body = Vec<PaymentResponse>),
        (status = 404, description = "Order not found"),
    ),
    tag = "payments"
)]
pub async fn list_order_payments(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let payments =
        web::block(move || state.payments.get_payments_for_order(user_id, order_id)).await??;

    let body: Vec<PaymentResponse> = payments.into_iter().map(PaymentResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// PATCH /admin/payments/{id}/status
#[utoipa::path(
    patch,
    path = "/admin/payments/{id}/status",
    request_body = UpdatePaymentStatusRequest,
    params(
        ("id" = Uuid, Path, description = "Payment UUID"),
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
        ("X-User-Role" = String, Header, description = "Must be ADMIN"),
    ),
    responses(
        (status = 200, description = "Status updated", body = PaymentResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Payment not found"),
        (status = 422, description = "Unknown status"),
    ),
    tag = "admin"
)]
pub async fn update_payment_status(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let body = body.into_inner();
    let status: PaymentStatus = body.status.parse()?;

    let payment = web::block(move || {
        state
            .payments
            .update_payment_status(payment_id, status, body.failure_reason)
    })
    .await??;

    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}
