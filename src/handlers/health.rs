//! # Health Check Handler
//!
//! Simple endpoint to check if the server is running.
//! Used by load balancers and monitoring systems.

use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint
///
/// ## Route
/// GET /health
///
/// ## Response
/// ```json
/// {
///   "status": "healthy",
///   "service": "user-sync-gate"
/// }
/// ```
///
/// The path has no extension and is not on the public allow-list, so the
/// request gate treats it as private. Mount it outside the gate (see `main`).
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "user-sync-gate"
    }))
}
