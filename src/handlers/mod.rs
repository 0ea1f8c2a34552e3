pub mod carts;
pub mod identity;
pub mod orders;
pub mod payments;

use actix_web::HttpResponse;

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "health"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
