use utoipa::OpenApi;

use crate::handlers::{self, carts, orders, payments};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Commerce Service",
        description = "Carts, checkout into orders, order lifecycle and payment records."
    ),
    paths(
        handlers::health,
        carts::get_cart,
        carts::add_item,
        carts::update_item,
        carts::remove_item,
        carts::clear_cart,
        carts::set_addresses,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        orders::update_order_status,
        payments::create_payment,
        payments::get_payment,
        payments::list_order_payments,
        payments::update_payment_status,
    ),
    components(schemas(
        carts::AddCartItemRequest,
        carts::UpdateCartItemRequest,
        carts::SetAddressesRequest,
        carts::CartLineResponse,
        carts::CartResponse,
        orders::CreateOrderRequest,
        orders::UpdateOrderStatusRequest,
        orders::OrderLineResponse,
        orders::OrderResponse,
        orders::ListOrdersResponse,
        payments::CreatePaymentRequest,
        payments::UpdatePaymentStatusRequest,
        payments::PaymentResponse,
    )),
    tags(
        (name = "cart", description = "The caller's shopping cart"),
        (name = "orders", description = "Checkout and order history"),
        (name = "payments", description = "Payment records"),
        (name = "admin", description = "Administrative status changes"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;
