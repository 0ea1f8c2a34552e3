pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::order_service::OrderService;
use application::payment_service::PaymentService;
use domain::status::TransitionPolicy;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::catalog_repo::DieselCatalogOracle;
use infrastructure::memory::{InMemoryCatalog, InMemoryStore};
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::payment_repo::DieselPaymentRepository;

pub use config::Config;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// The application services shared by all workers.
pub struct AppState {
    pub orders: OrderService,
    pub carts: CartService,
    pub payments: PaymentService,
}

impl AppState {
    pub fn postgres(pool: DbPool, policy: TransitionPolicy) -> Self {
        let carts = Arc::new(DieselCartRepository::new(pool.clone()));
        let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
        let payments = Arc::new(DieselPaymentRepository::new(pool.clone()));
        let catalog = Arc::new(DieselCatalogOracle::new(pool));

        AppState {
            orders: OrderService::new(carts.clone(), orders.clone(), catalog.clone(), policy),
            carts: CartService::new(carts, catalog),
            payments: PaymentService::new(payments, orders),
        }
    }

    pub fn in_memory(
        store: Arc<InMemoryStore>,
        catalog: Arc<InMemoryCatalog>,
        policy: TransitionPolicy,
    ) -> Self {
        AppState {
            orders: OrderService::new(store.clone(), store.clone(), catalog.clone(), policy),
            carts: CartService::new(store.clone(), catalog),
            payments: PaymentService::new(store.clone(), store),
        }
    }
}

/// Registers every route. Shared by [`build_server`] and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use handlers::{carts, orders, payments};

    cfg.route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/cart")
                .route("", web::get().to(carts::get_cart))
                .route("", web::delete().to(carts::clear_cart))
                .route("/items", web::post().to(carts::add_item))
                .route("/items/{product_id}", web::put().to(carts::update_item))
                .route("/items/{product_id}", web::delete().to(carts::remove_item))
                .route("/addresses", web::put().to(carts::set_addresses)),
        )
        .service(
            web::scope("/orders")
                .route("", web::post().to(orders::create_order))
                .route("", web::get().to(orders::list_orders))
                .route("/{id}", web::get().to(orders::get_order))
                .route("/{id}/cancel", web::post().to(orders::cancel_order))
                .route("/{id}/payments", web::get().to(payments::list_order_payments)),
        )
        .service(
            web::scope("/payments")
                .route("", web::post().to(payments::create_payment))
                .route("/{id}", web::get().to(payments::get_payment)),
        )
        .service(
            web::scope("/admin")
                .route(
                    "/orders/{id}/status",
                    web::patch().to(orders::update_order_status),
                )
                .route(
                    "/payments/{id}/status",
                    web::patch().to(payments::update_payment_status),
                ),
        );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let openapi = openapi::ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind((host.to_string(), port))?
    .run())
}
