//! Outbound call to the user sync endpoint.

use super::identity::Identity;
use async_trait::async_trait;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Path of the sync endpoint on the application's own origin
pub const SYNC_PATH: &str = "/api/sync";

/// Body of `POST /api/sync`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// The sync call could not be completed. Non-2xx answers are not errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request has no host to derive the sync origin from")]
    MissingHost,

    #[error("invalid sync URL for origin '{origin}': {source}")]
    InvalidUrl {
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error("sync request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait UserSync: Send + Sync {
    /// POST the identity to `url`. `Ok` carries whatever status came back.
    async fn sync_user(&self, url: &Url, identity: &Identity) -> Result<StatusCode, SyncError>;
}

/// [`UserSync`] over HTTP with reqwest.
///
/// No timeout is configured: a hung sync endpoint holds the request open.
#[derive(Debug, Clone, Default)]
pub struct HttpUserSync {
    client: reqwest::Client,
}

impl HttpUserSync {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserSync for HttpUserSync {
    async fn sync_user(&self, url: &Url, identity: &Identity) -> Result<StatusCode, SyncError> {
        let payload = SyncPayload {
            user_id: Some(identity.to_string()),
        };

        let response = self
            .client
            .post(url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await?;

        Ok(response.status())
    }
}

/// Origin the request was made to, e.g. `https://app.example.com`.
///
/// `X-Forwarded-Proto` and `X-Forwarded-Host` are only read when
/// `trust_forwarded` is set. Any client can send them, so they are only
/// meaningful behind a proxy that overwrites them.
pub fn request_origin(parts: &Parts, trust_forwarded: bool) -> Result<String, SyncError> {
    let scheme = forwarded_header(parts, "x-forwarded-proto", trust_forwarded)
        .or(parts.uri.scheme_str())
        .unwrap_or("http");

    let host = forwarded_header(parts, "x-forwarded-host", trust_forwarded)
        .or_else(|| first_header_value(parts, header::HOST.as_str()))
        .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
        .ok_or(SyncError::MissingHost)?;

    Ok(format!("{}://{}", scheme, host))
}

/// Absolute URL of the sync endpoint for an origin.
pub fn sync_url(origin: &str) -> Result<Url, SyncError> {
    Url::parse(origin)
        .and_then(|base| base.join(SYNC_PATH))
        .map_err(|source| SyncError::InvalidUrl {
            origin: origin.to_string(),
            source,
        })
}

fn forwarded_header<'a>(parts: &'a Parts, name: &str, trusted: bool) -> Option<&'a str> {
    if trusted {
        first_header_value(parts, name)
    } else {
        None
    }
}

// Proxies may append to forwarded headers; the first entry is the client-facing one
fn first_header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
