//! # User Sync Handler
//!
//! The endpoint the request gate calls the first time it sees a signed-in
//! user without a validation cookie.
//!
//! ## Idempotency
//! Several requests from the same browser can race to sync the same user
//! before any of them gets the cookie back. Every call is therefore an upsert
//! keyed on the external id: the first creates the row, the rest only bump
//! `last_synced_at`.

use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::middleware::sync::SyncPayload;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Sync a user into the database
///
/// ## Route
/// POST /api/sync (public)
///
/// ## Request
/// ```json
/// { "userId": "user_2abc" }
/// ```
///
/// ## Response
/// ```json
/// {
///   "success": true,
///   "user": { "id": "...", "external_id": "user_2abc", ... }
/// }
/// ```
///
/// A missing, null or blank `userId` is a 400.
pub async fn sync_user(
    State(state): State<AppState>,
    Json(payload): Json<SyncPayload>,
) -> AppResult<Json<Value>> {
    let external_id = payload
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("userId is required".to_string()))?;

    let user = users::upsert_synced_user(&state.db, external_id).await?;
    tracing::info!(user_id = %user.external_id, "User synced");

    Ok(Json(json!({
        "success": true,
        "user": user
    })))
}
