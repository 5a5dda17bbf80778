//! # User Handlers
//!
//! Handlers for the signed-in user's own record.

use crate::db::users;
use crate::error::AppResult;
use crate::middleware::identity::Identity;
use crate::state::AppState;
use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

/// Get the current user's synced record
///
/// ## Route
/// GET /api/users/me
///
/// ## Authentication
/// Private route. The request gate has already rejected anonymous callers and
/// put the resolved `Identity` into the request extensions.
///
/// ## Response
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "external_id": "user_2abc",
///   "created_at": "2024-01-15T10:30:00Z",
///   "last_synced_at": "2024-01-15T10:30:00Z"
/// }
/// ```
///
/// Returns 404 until the user has been synced at least once.
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<Value>> {
    let user = users::find_by_external_id(&state.db, identity.as_str()).await?;

    Ok(Json(json!({
        "id": user.id,
        "external_id": user.external_id,
        "created_at": user.created_at,
        "last_synced_at": user.last_synced_at
    })))
}
