//! # Configuration Management
//!
//! This module handles loading configuration from environment variables.
//! It uses the "12-factor app" methodology where configuration comes from the environment.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `DATABASE_URL`: SQLite database connection string
//! - `APP_ENV`: Deployment environment; `production` marks cookies `Secure`
//! - `PUBLIC_ROUTES`: Comma-separated list of routes reachable without signing in
//! - `SIGN_IN_URL`: Where page requests are redirected when sign-in is required
//! - `TRUST_FORWARDED_HEADERS`: `true` when running behind a proxy that sets `X-Forwarded-*`

use crate::middleware::routes::RoutePattern;
use anyhow::Result;
use std::env;

/// Public routes used when `PUBLIC_ROUTES` is not set.
///
/// `sign-up(.*)` has no leading slash, so it never matches a request path.
/// It is kept exactly as the product configured it until the intent is confirmed.
pub const DEFAULT_PUBLIC_ROUTES: &str = "/,/sign-in(.*),sign-up(.*),/api/artworks/liked,/api/sync";

/// Application configuration
///
/// This struct holds all configuration values needed to run the server.
/// All fields are public for easy access from other modules.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    /// Examples: "127.0.0.1" (localhost only), "0.0.0.0" (all interfaces)
    pub host: String,

    /// Server port number (1-65535)
    /// Default: 8080
    pub port: u16,

    /// SQLite database connection URL
    /// Format: "sqlite:filename.db?mode=rwc"
    /// The "mode=rwc" means: read, write, create if not exists
    pub database_url: String,

    /// Deployment environment name
    /// Only the exact value "production" changes behavior (Secure cookies)
    pub app_env: String,

    /// Ordered allow-list of routes that do not require a signed-in user
    /// Everything not listed here is private
    pub public_routes: Vec<RoutePattern>,

    /// Sign-in page for page requests that hit a private route
    /// API requests get a 401 instead
    pub sign_in_url: String,

    /// Whether `X-Forwarded-Host`/`X-Forwarded-Proto` decide the sync origin
    /// Only enable behind a reverse proxy that overwrites these headers
    /// Default: false (the `Host` header is used)
    pub trust_forwarded_headers: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads variables from .env file (if present) using dotenvy
    /// 2. Reads each configuration value from environment
    /// 3. Falls back to sensible defaults if variables aren't set
    /// 4. Returns an error if required parsing fails (e.g., invalid port number)
    ///
    /// ## Example .env file
    /// ```text
    /// HOST=127.0.0.1
    /// PORT=8080
    /// DATABASE_URL=sqlite:user-sync-gate.db?mode=rwc
    /// APP_ENV=development
    /// PUBLIC_ROUTES=/,/sign-in(.*),/api/sync
    /// SIGN_IN_URL=/sign-in
    /// TRUST_FORWARDED_HEADERS=false
    /// ```
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (dotenvy doesn't error if file missing)
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            // The ? operator propagates parse errors
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:user-sync-gate.db?mode=rwc".to_string()),

            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),

            // Parse the allow-list; an empty pattern in the list is a config mistake
            public_routes: RoutePattern::parse_list(
                &env::var("PUBLIC_ROUTES").unwrap_or_else(|_| DEFAULT_PUBLIC_ROUTES.to_string()),
            )?,

            sign_in_url: env::var("SIGN_IN_URL").unwrap_or_else(|_| "/sign-in".to_string()),

            // Accepts "true" or "false"
            trust_forwarded_headers: env::var("TRUST_FORWARDED_HEADERS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
        })
    }

    /// Get the socket address to bind the server to
    ///
    /// Combines host and port into a format suitable for TCP binding.
    /// Example: "127.0.0.1:8080"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether this is a production deployment
    ///
    /// Validation cookies are only marked `Secure` in production so that
    /// local development over plain HTTP keeps working.
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}
