//! # Auth Module
//!
//! Email/password accounts and the session model shared with OAuth sign-in:
//! - Argon2 password hashing and strength rules
//! - Short-lived JWT access tokens
//! - Rotating refresh sessions stored as SHA-256 digests
//! - `RequestContext` and `AuthedUser` extractors

pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod password;
pub mod routes;
pub mod sessions;
pub mod store;
pub mod tokens;
pub mod validators;

#[cfg(test)]
mod tests;

pub use extractors::RequestContext;
pub use routes::auth_routes;
