use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::order_service::DEFAULT_PAGE_LIMIT;
use crate::domain::order::{Order, OrderLine, OrderStatus, Page};
use crate::errors::AppError;
use crate::handlers::identity::{AdminUser, AuthenticatedUser};
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

/// Both addresses fall back to the ones stored on the cart when omitted.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of PENDING, CONFIRMED, SHIPPED, DELIVERED, CANCELLED.
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub quantity: i32,
    /// Decimal amounts are strings to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
    pub discount_amount: String,
    pub tax_amount: String,
    pub total_price: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub total_amount: String,
    pub created_at: String,
    pub updated_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(l: OrderLine) -> Self {
        OrderLineResponse {
            id: l.id,
            product_id: l.product_id,
            variant_id: l.variant_id,
            product_name: l.product_name,
            variant_name: l.variant_name,
            sku: l.sku,
            quantity: l.quantity,
            unit_price: l.unit_price.to_string(),
            discount_amount: l.discount_amount.to_string(),
            tax_amount: l.tax_amount.to_string(),
            total_price: l.total_price.to_string(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            id: o.id,
            user_id: o.user_id,
            status: o.status.to_string(),
            payment_status: o.payment_status.to_string(),
            shipping_address_id: o.shipping_address_id,
            billing_address_id: o.billing_address_id,
            total_amount: o.total_amount.to_string(),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
            lines: o.lines.into_iter().map(OrderLineResponse::from).collect(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl From<Page<Order>> for ListOrdersResponse {
    fn from(p: Page<Order>) -> Self {
        ListOrdersResponse {
            items: p.items.into_iter().map(OrderResponse::from).collect(),
            total: p.total,
            page: p.page,
            limit: p.limit,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Converts the caller's cart into a PENDING order priced from the catalog.
/// The order, its lines, the emptied cart and the `OrderPlaced` outbox event
/// are committed together.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    params(("X-User-Id" = Uuid, Header, description = "Calling user")),
    responses(
        (status = 201, description = "Order created successfully", body = OrderResponse),
        (status = 400, description = "Malformed request body"),
        (status = 404, description = "Cart not found"),
        (status = 409, description = "Cart changed during checkout"),
        (status = 422, description = "Empty cart, missing address or invalid product"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    payload: web::Bytes,
) -> Result<HttpResponse, AppError> {
    // Only an absent body falls back to the cart's addresses.
    let body: CreateOrderRequest = if payload.iter().all(u8::is_ascii_whitespace) {
        CreateOrderRequest::default()
    } else {
        serde_json::from_slice(&payload)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let order = web::block(move || {
        state.orders.create_order_from_cart(
            user_id,
            body.shipping_address_id,
            body.billing_address_id,
        )
    })
    .await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
///
/// Orders of other users are reported as not found.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.get_order_by_id(order_id, user_id)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// The caller's orders, newest first. Use `page` (1-based) and `limit` to
/// control pagination.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ListOrdersParams,
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();

    let page = web::block(move || {
        state
            .orders
            .get_user_orders(user_id, params.page, params.limit)
    })
    .await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse::from(page)))
}

/// POST /orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order can no longer be cancelled"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.cancel_order(order_id, user_id)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /admin/orders/{id}/status
#[utoipa::path(
    patch,
    path = "/admin/orders/{id}/status",
    request_body = UpdateOrderStatusRequest,
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
        ("X-User-Role" = String, Header, description = "Must be ADMIN"),
    ),
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed"),
        (status = 422, description = "Unknown status"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "admin"
)]
pub async fn update_order_status(
    state: web::Data<AppState>,
    AdminUser(admin_id): AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status: OrderStatus = body.status.parse()?;
    log::info!(
        "Admin {} requested status {} for order {}",
        admin_id,
        status,
        order_id
    );

    let order = web::block(move || state.orders.update_order_status(order_id, status)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
