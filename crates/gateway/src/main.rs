//! RecipeGuard API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Caller identification
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod extract;
mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use recipeguard_common::{
    config::AppConfig,
    db::DbPool,
    metrics,
    recommend::RecommendClient,
    storage::{ImageStore, MemoryImageStore, S3ImageStore},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub store: Arc<dyn ImageStore>,
    pub recommend: RecommendClient,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    init_tracing(&config);

    info!(
        "Starting RecipeGuard API Gateway v{}",
        recipeguard_common::VERSION
    );

    // Initialize metrics
    metrics::register_metrics();
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;

    let config = Arc::new(config);

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // Select the image store backend
    let store: Arc<dyn ImageStore> = if config.storage.in_memory {
        info!("Using in-memory image store");
        Arc::new(MemoryImageStore::new())
    } else {
        info!(bucket = %config.storage.bucket, "Using S3 image store");
        Arc::new(S3ImageStore::new(&config.storage).await)
    };

    let recommend = RecommendClient::new(&config.recommend);

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        store,
        recommend,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no caller required)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Browse endpoints
        .route("/recipes", get(handlers::recipes::list_recipes))
        .route("/recipes/filtered", get(handlers::recipes::list_filtered_recipes))
        .route("/recipes/cuisine/{cuisine}", get(handlers::recipes::list_by_cuisine))
        .route(
            "/recipes/cuisine/{cuisine}/filtered",
            get(handlers::recipes::list_by_cuisine_filtered),
        )
        .route("/recipes/search", get(handlers::recipes::search_recipes))
        .route(
            "/recipes/search/filtered",
            get(handlers::recipes::search_filtered_recipes),
        )
        .route("/recipes/today", get(handlers::recommend::today_recipe))
        .route("/recipes/{id}", get(handlers::recipes::recipe_detail))
        // Owned-recipe endpoints
        .route("/users/me/recipes", get(handlers::my_recipes::my_recipes))
        .route("/recipes", post(handlers::my_recipes::create_recipe))
        .route("/recipes/{id}/edit-form", get(handlers::my_recipes::edit_form))
        .route("/recipes/{id}", put(handlers::my_recipes::update_recipe))
        .route("/recipes/{id}", delete(handlers::my_recipes::delete_recipe));

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
