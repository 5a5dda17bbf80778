//! # Error Handling
//!
//! This module defines the application error type and how it turns into an
//! HTTP response.
//!
//! ## Where errors come from
//! - The `/api/sync` upsert and `/api/users/me` lookup (database errors)
//! - The session store behind the identity provider (internal errors)
//! - The request gate rejecting API calls to private routes (401)
//!
//! Failures of the sync call made *by* the gate are not `AppError`s: the gate
//! records them in the validation cookie and lets the request through.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type
///
/// Each variant maps to one HTTP status. The `#[from]` variants let handlers
/// use `?` directly on sqlx and serde_json results.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors (SQLx library errors)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource not found errors (404)
    ///
    /// Used when the signed-in user has never been synced into the database
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request errors (400)
    ///
    /// Used when the sync payload has no usable user id
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication errors (401)
    ///
    /// Used when an API request hits a private route without a signed-in user
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server errors (500)
    ///
    /// Used for unexpected failures such as an unreadable session store
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response
///
/// ## How it works
/// 1. Match the error type
/// 2. Log detailed error information for anything the client should not see
/// 3. Pick the HTTP status code
/// 4. Return `{ "error": "..." }` as JSON
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(e) => {
                // Log detailed error for debugging (not shown to user)
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error".to_string())
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            // For these errors, the custom message is safe to show to users
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using AppError
///
/// Example usage:
/// ```rust
/// pub async fn find_user(pool: &SqlitePool, external_id: &str) -> AppResult<User> {
///     let user = users::find_by_external_id(pool, external_id).await?;
///     Ok(user)
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;
