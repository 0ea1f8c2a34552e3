use commerce_service::{build_server, create_pool, run_migrations, AppState, Config};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().expect("Invalid configuration");

    let pool = create_pool(&config.database_url, config.pool_size)
        .expect("Failed to create database connection pool");
    run_migrations(&pool).expect("Failed to run database migrations");

    log::info!(
        "Starting server at http://{}:{} (transition policy: {:?})",
        config.host,
        config.port,
        config.transition_policy
    );

    let state = AppState::postgres(pool, config.transition_policy);
    build_server(state, &config.host, config.port)?.await
}
