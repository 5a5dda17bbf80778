//! # Application State
//!
//! Shared resources handed to every handler through Axum's `State` extractor.
//!
//! Only the handlers need the database. The request gate carries its own state
//! (`Arc<RequestGate>`) and reaches the database solely through the
//! `/api/sync` endpoint, the same way any other client would.

use crate::config::Config;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Shared application state
///
/// Cloned per request; cloning a `SqlitePool` only clones a handle.
#[derive(Clone)]
pub struct AppState {
    /// Users table for `/api/sync` and `/api/users/me`, plus the session store
    pub db: SqlitePool,
}

impl AppState {
    /// Open the database named by `DATABASE_URL` and bring its schema up to date
    ///
    /// # Errors
    /// Returns an error if the URL is malformed, the database cannot be opened,
    /// or a migration fails
    pub async fn new(config: &Config) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            // Concurrent syncs write to the same table; wait for the lock instead of failing
            .busy_timeout(std::time::Duration::from_secs(5));

        let db = SqlitePoolOptions::new().connect_with(options).await?;

        Self::from_pool(db).await
    }

    /// Wrap an existing pool, applying the embedded migrations from `./migrations`
    pub async fn from_pool(db: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&db).await?;
        tracing::debug!("Database migrations applied");

        Ok(AppState { db })
    }
}
