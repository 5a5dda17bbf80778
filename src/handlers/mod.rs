//! # HTTP Request Handlers
//!
//! This module contains all the HTTP route handlers.
//!
//! ## Submodules
//! - `health`: Health check endpoint (for monitoring)
//! - `sync`: The user sync endpoint the request gate calls
//! - `users`: The signed-in user's own record
//!
//! Handlers never check sign-in themselves: the request gate in front of the
//! router has already done it, and private handlers read the `Identity` it
//! left in the request extensions.

pub mod health;
pub mod sync;
pub mod users;
