//! # Validation Cookie
//!
//! A per-user, per-device marker meaning "this identity was already synced to
//! the database". It lets the gate skip the sync call on every later request.
//!
//! ## Cookie Protocol
//! - Name: `userValidatedInDatabase_{identity}` (one cookie per identity, so
//!   two users sharing a browser profile never read each other's marker)
//! - Value: JSON `{"isValid": bool, "timestamp": ms, "error"?: string}`
//! - Attributes: `HttpOnly`, `SameSite=Lax`, `Path=/`, `Secure` in production
//! - Lifetime: 7 days after a successful sync, 1 hour after a failed one
//!
//! Expiry is handled entirely by the browser through `Max-Age`; nothing on the
//! server ever deletes these cookies.

use super::identity::Identity;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::Cookie;

/// Prefix of every validation cookie name
pub const COOKIE_PREFIX: &str = "userValidatedInDatabase_";

/// Max-Age after a successful sync: 1 week
pub const VALID_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Max-Age after a failed sync: 1 hour, so the next attempt comes sooner
pub const FAILED_MAX_AGE_SECS: i64 = 60 * 60;

/// Error message stored in the cookie when the sync call could not be made
pub const SYNC_FAILED_MESSAGE: &str = "Sync failed";

/// Derive the cookie name for an identity
///
/// ## Example
/// ```rust
/// let name = cookie_name(&Identity::new("user_2abc"));
/// assert_eq!(name, "userValidatedInDatabase_user_2abc");
/// ```
pub fn cookie_name(identity: &Identity) -> String {
    format!("{}{}", COOKIE_PREFIX, identity.as_str())
}

/// Cookie payload
///
/// `is_valid` and `timestamp` are always written together. `error` is only
/// present on records written after a failed sync.
///
/// ## Example JSON
/// ```json
/// { "isValid": false, "timestamp": 1718000000000, "error": "Sync failed" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRecord {
    pub is_valid: bool,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationRecord {
    /// Record written after the sync endpoint answered with a 2xx
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            timestamp: Utc::now().timestamp_millis(),
            error: None,
        }
    }

    /// Record written after the sync call itself failed
    pub fn sync_failed() -> Self {
        Self {
            is_valid: false,
            timestamp: Utc::now().timestamp_millis(),
            error: Some(SYNC_FAILED_MESSAGE.to_string()),
        }
    }

    /// How long the browser keeps this record
    pub fn max_age(&self) -> Duration {
        if self.is_valid {
            Duration::seconds(VALID_MAX_AGE_SECS)
        } else {
            Duration::seconds(FAILED_MAX_AGE_SECS)
        }
    }

    /// Encode the record as the cookie value
    ///
    /// This is the only place the payload format is produced.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a cookie value back into a record
    pub fn decode(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }

    /// Build the `Set-Cookie` entry for this record
    ///
    /// ## Parameters
    /// - `identity`: whose marker this is (drives the cookie name)
    /// - `secure`: whether to add the `Secure` attribute (production only)
    pub fn to_cookie(
        &self,
        identity: &Identity,
        secure: bool,
    ) -> Result<Cookie<'static>, serde_json::Error> {
        let cookie = Cookie::build((cookie_name(identity), self.encode()?))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .max_age(self.max_age())
            .build();

        Ok(cookie)
    }
}
