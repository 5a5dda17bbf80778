//! # Middleware Module
//!
//! Middleware intercepts HTTP requests and responses.
//! Used for cross-cutting concerns like authentication, logging, CORS, etc.
//!
//! ## Our Middleware
//! The request gate (`gate`) runs in front of every route and:
//! - sends anonymous visitors of private routes to sign in
//! - syncs signed-in users into the database once, then remembers that in a
//!   per-user cookie so later requests skip the call
//!
//! ## Submodules
//! - `routes`: which paths the gate covers, and which of those are public
//! - `identity`: who the caller is (read from the session)
//! - `cookie`: the validation cookie and its JSON payload
//! - `sync`: the outbound `POST /api/sync` call
//! - `events`: structured events for logging and tests
//! - `gate`: the middleware tying it all together

pub mod cookie;
pub mod events;
pub mod gate;
pub mod identity;
pub mod routes;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;
