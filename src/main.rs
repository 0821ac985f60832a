//! Aklatan Server - Library Circulation System
//!
//! REST API server managing the borrow pipeline of a small library.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aklatan_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("aklatan_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Aklatan Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool.clone());
    let services = Services::new(repository, config.auth.clone(), config.storage.clone());

    // Seed the first staff account when the staff table is empty
    services
        .identity
        .bootstrap_staff()
        .await
        .expect("Failed to bootstrap staff account");

    // Background sweep marks due loans returned or overdue
    aklatan_server::services::sweeper::spawn(
        services.circulation.clone(),
        config.sweep.interval_seconds,
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        pool,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/signup", post(api::auth::signup))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Books (catalog)
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        .route("/books/:id/availability", get(api::books::get_availability))
        // Favorites
        .route("/favorites", get(api::books::list_favorites))
        .route("/favorites/:book_id", put(api::books::add_favorite))
        .route("/favorites/:book_id", delete(api::books::remove_favorite))
        // Circulation: cart
        .route("/circulation/cart", get(api::circulation::get_cart))
        .route("/circulation/cart", post(api::circulation::add_to_cart))
        .route("/circulation/cart/:book_id", delete(api::circulation::remove_from_cart))
        // Circulation: requests
        .route("/circulation/requests", get(api::circulation::list_requests))
        .route("/circulation/requests", post(api::circulation::request_borrow))
        .route("/circulation/requests/:id/approve", post(api::circulation::approve_request))
        .route("/circulation/borrow", post(api::circulation::direct_borrow))
        // Circulation: pickups and loans
        .route("/circulation/pickups", get(api::circulation::list_pickups))
        .route("/circulation/pickups", post(api::circulation::confirm_pickup))
        .route("/circulation/loans", get(api::circulation::list_loans))
        // Circulation: staff feeds and sweep
        .route("/circulation/transactions", get(api::circulation::list_transactions))
        .route("/circulation/activity", get(api::circulation::list_activity))
        .route("/circulation/sweep", post(api::circulation::run_sweep))
        // Reports
        .route("/reports/dashboard", get(api::reports::get_dashboard))
        .route("/reports/trends", get(api::reports::get_trends))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
