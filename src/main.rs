use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use affiliate_backend::handlers::{external_order, lead, payout_exception, postback};
use affiliate_backend::jobs::rate_limit_sweep::start_rate_limit_sweep_job;
use affiliate_backend::services::postback::PostbackDispatcher;
use affiliate_backend::services::rate_limit::RateLimiters;
use affiliate_backend::AppState;
use axum::routing::{delete, get, patch, post};
use axum::Router;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,affiliate_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    let db = Arc::new(db);

    let rate_limits = Arc::new(RateLimiters::new());
    start_rate_limit_sweep_job(rate_limits.clone()).await;

    let postbacks = PostbackDispatcher::start(db.clone());

    let state = AppState {
        db,
        rate_limits,
        postbacks,
    };

    // Build router
    let app = Router::new()
        .route("/", get(health))
        .route(
            "/api/external/orders",
            post(external_order::create_external_order),
        )
        .route(
            "/api/external/orders/{order_number}/status",
            get(external_order::get_order_status),
        )
        .route("/api/leads/{lead_number}", get(lead::get_lead))
        .route(
            "/api/leads/{lead_number}/status",
            patch(lead::update_lead_status),
        )
        .route(
            "/api/payout-exceptions",
            get(payout_exception::list_payout_exceptions)
                .post(payout_exception::create_payout_exception),
        )
        .route(
            "/api/payout-exceptions/{id}",
            delete(payout_exception::delete_payout_exception),
        )
        .route(
            "/api/postback-config",
            get(postback::get_postback_config).put(postback::update_postback_config),
        )
        .route(
            "/api/postback-config/test",
            post(postback::send_test_postback),
        )
        .route(
            "/api/postback-notifications",
            get(postback::list_postback_notifications),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

async fn health() -> &'static str {
    "Affiliate backend is up"
}
