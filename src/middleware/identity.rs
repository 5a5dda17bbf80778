//! Identity resolution and sign-in enforcement.
//!
//! The gate never verifies credentials itself. It asks an [`IdentityProvider`]
//! who the caller is, and on private routes asks the same provider to reject
//! callers it cannot identify.

use crate::error::AppError;
use async_trait::async_trait;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use tower_sessions::Session;

/// Session key the sign-in flow stores the user id under
pub const SESSION_USER_KEY: &str = "user_id";

/// Opaque user id issued by the identity provider
///
/// Inserted into request extensions by the gate when resolved, so handlers can
/// take `Extension<Identity>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Who is making this request, if anyone.
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, AppError>;

    /// Response that ends a private request made without an identity.
    fn reject(&self, parts: &Parts) -> Response;
}

/// Reads the user id the sign-in flow stored in the tower-sessions session.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    sign_in_url: String,
}

impl SessionIdentity {
    pub fn new(sign_in_url: impl Into<String>) -> Self {
        Self {
            sign_in_url: sign_in_url.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, AppError> {
        // Present whenever the SessionManagerLayer wraps the gate
        let Some(session) = parts.extensions.get::<Session>() else {
            tracing::warn!("No session layer in front of the request gate");
            return Ok(None);
        };

        let user_id: Option<String> = session
            .get(SESSION_USER_KEY)
            .await
            .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?;

        Ok(user_id.filter(|id| !id.is_empty()).map(Identity::new))
    }

    fn reject(&self, parts: &Parts) -> Response {
        // API callers get a status code, browsers get sent to sign in
        if parts.uri.path().starts_with("/api/") {
            AppError::Unauthorized("Not authenticated".to_string()).into_response()
        } else {
            Redirect::to(&self.sign_in_url).into_response()
        }
    }
}
