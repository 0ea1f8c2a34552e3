use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};
use crate::errors::AppError;
use crate::handlers::identity::AuthenticatedUser;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CartItemQuery {
    pub variant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAddressesRequest {
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartLineResponse {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    /// Price seen when the item was added; checkout reprices from the catalog.
    pub unit_price: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub version: i64,
    pub updated_at: String,
    pub items: Vec<CartLineResponse>,
}

impl From<CartLine> for CartLineResponse {
    fn from(l: CartLine) -> Self {
        CartLineResponse {
            product_id: l.product_id,
            variant_id: l.variant_id,
            quantity: l.quantity,
            unit_price: l.unit_price.map(|p| p.to_string()),
        }
    }
}

impl From<Cart> for CartResponse {
    fn from(c: Cart) -> Self {
        CartResponse {
            id: c.id,
            user_id: c.user_id,
            shipping_address_id: c.shipping_address_id,
            billing_address_id: c.billing_address_id,
            version: c.version,
            updated_at: c.updated_at.to_rfc3339(),
            items: c.lines.into_iter().map(CartLineResponse::from).collect(),
        }
    }
}

/// GET /cart
#[utoipa::path(
    get,
    path = "/cart",
    params(("X-User-Id" = Uuid, Header, description = "Calling user")),
    responses(
        (status = 200, description = "The caller's cart", body = CartResponse),
        (status = 404, description = "No cart yet"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let cart = web::block(move || state.carts.get_cart(user_id)).await??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/items
///
/// Adding a product that is already in the cart increases its quantity.
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddCartItemRequest,
    params(("X-User-Id" = Uuid, Header, description = "Calling user")),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 409, description = "Cart changed concurrently"),
        (status = 422, description = "Invalid quantity, unknown product or insufficient stock"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let cart = web::block(move || {
        state
            .carts
            .add_item(user_id, body.product_id, body.variant_id, body.quantity)
    })
    .await??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /cart/items/{product_id}
#[utoipa::path(
    put,
    path = "/cart/items/{product_id}",
    request_body = UpdateCartItemRequest,
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart or item not found"),
        (status = 422, description = "Invalid quantity or insufficient stock"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let body = body.into_inner();

    let cart = web::block(move || {
        state
            .carts
            .update_item(user_id, product_id, body.variant_id, body.quantity)
    })
    .await??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart/items/{product_id}
#[utoipa::path(
    delete,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        CartItemQuery,
        ("X-User-Id" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart or item not found"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<CartItemQuery>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let variant_id = query.into_inner().variant_id;

    let cart =
        web::block(move || state.carts.remove_item(user_id, product_id, variant_id)).await??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart
///
/// Removes every item; the cart itself and its addresses remain.
#[utoipa::path(
    delete,
    path = "/cart",
    params(("X-User-Id" = Uuid, Header, description = "Calling user")),
    responses(
        (status = 200, description = "Emptied cart", body = CartResponse),
        (status = 404, description = "No cart yet"),
    ),
    tag = "cart"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let cart = web::block(move || state.carts.clear_cart(user_id)).await??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /cart/addresses
#[utoipa::path(
    put,
    path = "/cart/addresses",
    request_body = SetAddressesRequest,
    params(("X-User-Id" = Uuid, Header, description = "Calling user")),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "No cart yet"),
    ),
    tag = "cart"
)]
pub async fn set_addresses(
    state: web::Data<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: web::Json<SetAddressesRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let cart = web::block(move || {
        state
            .carts
            .set_addresses(user_id, body.shipping_address_id, body.billing_address_id)
    })
    .await??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
