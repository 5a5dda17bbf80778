//! # Database Module
//!
//! - `models`: Data structures (User)
//! - `users`: Sync upsert and lookups for users
//!
//! Migrations live in `./migrations` and are embedded at compile time.

pub mod models;
pub mod users;
