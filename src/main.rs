//! Regulation Change Tracker Backend
//!
//! A REST backend for tracking regulatory documents: reviewers upload PDF
//! versions, an external analysis service detects the textual changes between
//! versions, and the API serves the change-review workflow (status triage,
//! field edits, comments) plus the aggregated cross-regulation overview.

mod analysis;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod overview;
mod review;
mod storage;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use analysis::ChangeAnalyzer;
use config::Config;
use db::Repository;
use storage::UploadStore;

/// Maximum accepted upload size: regulation PDFs up to 50 MB.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub uploads: Arc<UploadStore>,
    pub analyzer: Arc<dyn ChangeAnalyzer>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Regulation Change Tracker Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    match &config.analyzer_url {
        Some(url) => tracing::info!("Analysis service: {}", url),
        None => tracing::warn!(
            "No analysis service configured (REGTRACK_ANALYZER_URL). \
             New versions will be stored without detected changes."
        ),
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Upload storage and analyzer client
    let uploads = Arc::new(UploadStore::new(config.upload_dir.clone()));
    let analyzer = analysis::from_config(&config.analyzer_url);

    // Create application state
    let state = AppState {
        repo,
        uploads,
        analyzer,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Regulations and versions
        .route("/regulations", get(api::list_regulations))
        .route("/regulations", post(api::create_regulation))
        .route("/regulations/{id}", delete(api::delete_regulation))
        .route("/regulations/{id}/status", put(api::toggle_regulation_status))
        .route("/regulations/{id}/review", get(api::review_view))
        .route("/regulations/{id}/versions", post(api::add_version))
        .route(
            "/regulations/{id}/versions/{vid}",
            delete(api::delete_version),
        )
        // Change review
        .route(
            "/regulations/{id}/versions/{vid}/changes/{cid}",
            put(api::update_change_status),
        )
        .route(
            "/regulations/{id}/versions/{vid}/changes/{cid}/edit",
            put(api::edit_change),
        )
        .route(
            "/regulations/{id}/versions/{vid}/changes/{cid}/comments",
            post(api::add_comment),
        )
        // Cross-regulation overview
        .route("/changes/overview", get(api::overview))
        .route("/changes/overview/export", get(api::export_overview))
        // Notifications
        .route("/notifications", get(api::list_notifications))
        .route("/notifications/{id}/seen", put(api::mark_notification_seen))
        // Accounts
        .route("/login", post(api::login))
        .route("/users", get(api::list_users))
        .route("/users", post(api::create_user))
        .route("/users/{id}", put(api::update_user))
        .route("/users/{id}", delete(api::delete_user))
        .route("/users/{id}/reset-password", put(api::reset_password))
        // Health check
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
