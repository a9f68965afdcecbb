use restaurant_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::{process, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database, route composition, then the HTTP server.
/// Any startup failure exits the process before the listener is bound.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: invalid configuration: {e}");
            process::exit(1);
        }
    };

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise fall back to verbose local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "restaurant_api=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON lines for log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to Postgres, check DATABASE_URL: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to apply migrations: {e}");
        process::exit(1);
    }

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState { repo, config };

    // 6. Route Composition
    // An inconsistent route table is a configuration bug: refuse to serve.
    let app = match create_router(app_state) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Route table rejected: {e}");
            process::exit(1);
        }
    };

    // 7. Server Startup
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {bind_addr}: {e}");
            process::exit(1);
        }
    };

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        process::exit(1);
    }
}
