//! # Database Models
//!
//! This module defines the data structures that map to database tables.
//! These structs represent rows in the database and include serialization
//! for JSON APIs and database mapping.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user synced from the identity provider
///
/// One row per identity. The row is created by the first `/api/sync` call for
/// an identity and touched by every later one.
///
/// ## Why Strings for dates?
/// SQLite stores timestamps as text (RFC3339 format), and strings serialize to
/// JSON without any extra configuration.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Local primary key (UUID v4)
    /// Example: "550e8400-e29b-41d4-a716-446655440000"
    pub id: String,

    /// The identity provider's user id
    /// Unique: this is the key sync upserts on
    pub external_id: String,

    /// When the row was first created (RFC3339 timestamp)
    pub created_at: String,

    /// When the row was last changed (RFC3339 timestamp)
    pub updated_at: String,

    /// When `/api/sync` last confirmed this user (RFC3339 timestamp)
    pub last_synced_at: String,
}

impl User {
    /// Create a new, not yet persisted user for an external identity
    ///
    /// Generates the local UUID and sets all timestamps to now.
    pub fn new(external_id: String) -> Self {
        let now = Utc::now().to_rfc3339();

        Self {
            id: Uuid::new_v4().to_string(),
            external_id,
            created_at: now.clone(),
            updated_at: now.clone(),
            last_synced_at: now,
        }
    }
}
