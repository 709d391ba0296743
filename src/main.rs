//! PixelPast Server - museum discovery and tour booking
//!
//! REST API server for bookings, the museum catalog, recommendations and the
//! museum assistant.

use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixelpast_server::{
    api,
    config::{AppConfig, ConversationBackend},
    repository::Repository,
    services::{redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pixelpast_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting PixelPast Server v{}", env!("CARGO_PKG_VERSION"));

    // The mirror and catalog degrade to their file fallbacks, so the pool
    // connects lazily and fails fast instead of blocking startup.
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect_lazy(&config.database.url)
        .context("Invalid database URL")?;

    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(()) => tracing::info!("Database migrations completed"),
        Err(e) => tracing::warn!("Database unavailable, running on file stores: {}", e),
    }

    let redis = if config.chat.store == ConversationBackend::Redis {
        match RedisService::new(&config.redis.url).await {
            Ok(redis) => {
                tracing::info!("Connected to Redis");
                Some(redis)
            }
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    } else {
        None
    };

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, &config, redis)
        .await
        .context("Failed to create services")?;

    if let Some(seed) = config.storage.museum_seed_csv.as_deref() {
        if let Err(e) = services.museums.seed_from_csv(seed).await {
            tracing::warn!("Museum seeding skipped: {}", e);
        }
    }

    spawn_reconciliation(&services, config.storage.reconcile_interval_secs);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically move file-held museum records into the primary store
fn spawn_reconciliation(services: &Services, interval_secs: u64) {
    if interval_secs == 0 {
        return;
    }
    let museums = services.museums.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match museums.reconcile().await {
                Ok(report) if report.moved > 0 => {
                    tracing::info!(moved = report.moved, remaining = report.remaining, "Catalog reconciled")
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Catalog reconciliation deferred: {}", e),
            }
        }
    });
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let qr_prefix = state.services.tickets.public_prefix();
    let qr_dir = state.config.storage.qr_dir.clone();

    let routes = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Bookings
        .route("/api/book", post(api::bookings::book))
        .route("/api/attend", post(api::bookings::attend))
        .route("/api/cancel", post(api::bookings::cancel))
        .route("/api/review", post(api::bookings::review))
        .route("/api/history", get(api::bookings::history))
        .route("/api/popular", get(api::stats::get_rating_distribution))
        // Recommendations
        .route("/api/personalized-recommendations", get(api::recommendations::from_history))
        .route("/api/personalized", get(api::recommendations::from_booked_types))
        .route("/recommendations", post(api::recommendations::recommend))
        .route("/recommend", post(api::recommendations::search))
        // Museums
        .route("/api/exhibitions", get(api::museums::list_exhibitions))
        .route("/api/museum-filters", get(api::museums::get_filters))
        .route("/api/museum-locations", get(api::museums::get_locations))
        // Assistant
        .route("/api/chat", post(api::chat::chat))
        .route("/api/chat/reset", post(api::chat::reset))
        // Contact
        .route("/api/contact", post(api::contact::send_contact))
        // Visitor accounts
        .route("/visitor/register", post(api::auth::visitor_register))
        .route("/visitor/login", post(api::auth::visitor_login))
        .route("/visitor/logout", post(api::auth::visitor_logout))
        .route("/visitor/me", get(api::auth::visitor_me))
        // Admin accounts
        .route("/admin/login", post(api::auth::admin_login))
        .route("/admin/register", post(api::auth::admin_register))
        .route("/admin/validate_passkey", post(api::auth::validate_passkey))
        .route("/admin/logout", post(api::auth::admin_logout))
        // Administration
        .route("/api/admin/passkeys", get(api::auth::list_passkeys))
        .route("/api/admin/passkeys", post(api::auth::create_passkey))
        .route("/api/admin/passkeys/:passkey", delete(api::auth::delete_passkey))
        .route("/api/admin/bookings", get(api::bookings::admin_bookings))
        .route("/api/admin/bookings/:ticket_id/status", put(api::bookings::update_status))
        .route("/api/admin/ratings", get(api::bookings::admin_ratings))
        .route("/api/admin/analytics", get(api::stats::get_analytics))
        .route("/api/admin/museums", get(api::museums::admin_list))
        .route("/api/admin/museums", post(api::museums::admin_create))
        .route("/api/admin/museums/reconcile", post(api::museums::admin_reconcile))
        .route("/api/admin/museums/:id", put(api::museums::admin_update))
        .route("/api/admin/museums/:id", delete(api::museums::admin_delete))
        // Statistics
        .route("/api/foreign-visitors", get(api::stats::get_foreign_visitors))
        .route("/api/foreign-visitors-by-district", get(api::stats::get_foreign_visitors_by_district))
        .route("/api/foreign-visitors-monthly", get(api::stats::get_foreign_visitors_monthly))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .merge(routes)
        .nest_service(&qr_prefix, ServeDir::new(qr_dir))
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
