//! # User Sync Gate
//!
//! Entry point for a web server whose routes sit behind a request gate.
//! The gate sends anonymous visitors of private pages to sign in and makes
//! sure every signed-in user exists in the application database.
//!
//! ## Key Concepts
//! - **Public routes**: reachable without signing in (configurable allow-list)
//! - **Sync**: upserting the signed-in user into the `users` table
//! - **Validation cookie**: remembers a sync per user and device, so the sync
//!   call happens once a week instead of on every request

// Module declarations - organize code into logical components
mod config;      // Configuration management (environment variables, settings)
mod db;          // Database operations (users)
mod error;       // Error handling and custom error types
mod handlers;    // HTTP request handlers (routes)
mod middleware;  // The request gate and its collaborators
mod state;       // Shared application state

use crate::config::Config;
use crate::handlers::health::health_check;
use crate::handlers::sync::sync_user;
use crate::handlers::users::get_current_user;
use crate::middleware::gate::{request_gate, RequestGate};
use crate::middleware::identity::SessionIdentity;
use crate::middleware::routes::RouteClassifier;
use crate::middleware::sync::{HttpUserSync, SYNC_PATH};
use crate::state::AppState;
use axum::{middleware as axum_middleware, routing::{get, post}, Router};
use std::sync::Arc;
use time::Duration;
// Cookie jar shared by the gate (reads and writes validation cookies)
use tower_cookies::CookieManagerLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
// Session management - the sign-in flow stores the user id here
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main application entry point
///
/// This function:
/// 1. Sets up logging
/// 2. Loads configuration from environment variables
/// 3. Opens the database and runs migrations
/// 4. Builds the request gate from the configured allow-list
/// 5. Configures sessions, CORS and tracing layers
/// 6. Starts the HTTP server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: info level for most crates, debug level for our app
    // Can be overridden with RUST_LOG environment variable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,user_sync_gate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let app_state = AppState::new(&config).await?;
    tracing::info!("Application state initialized");

    // The gate only reads identities; signing in happens elsewhere and
    // writes the user id into the shared session store
    let gate = RequestGate::new(
        RouteClassifier::new(config.public_routes.clone()),
        Arc::new(SessionIdentity::new(config.sign_in_url.clone())),
        Arc::new(HttpUserSync::new()),
    )
    .with_secure_cookies(config.is_production())
    .with_trusted_proxy(config.trust_forwarded_headers);
    tracing::info!("Request gate ready: {:?}", gate);

    // Sessions live in the same SQLite database
    let session_store = SqliteStore::new(app_state.db.clone());
    session_store.migrate().await?;

    // After 24 hours without activity, the user will need to sign in again
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)));

    // In production, you should restrict this to specific origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(app_state, Arc::new(gate))
        // Outside the gate: the gate reads the session
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router: every route behind the gate except `/health`
///
/// Layers run outside-in, so `CookieManagerLayer` wraps the gate and turns
/// the cookies it adds into `Set-Cookie` headers.
pub(crate) fn build_router(state: AppState, gate: Arc<RequestGate>) -> Router {
    Router::new()
        // Public: called by the gate itself
        .route(SYNC_PATH, post(sync_user))
        // Private: requires a signed-in user
        .route("/api/users/me", get(get_current_user))
        // Front-end pages and assets (index.html, app.js, styles.css, ...)
        .fallback_service(ServeDir::new("static"))
        .layer(axum_middleware::from_fn_with_state(gate, request_gate))
        .layer(CookieManagerLayer::new())
        // Added after the gate, so monitoring never needs a session
        .route("/health", get(health_check))
        .with_state(state)
}
