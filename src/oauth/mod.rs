//! # OAuth Module
//!
//! Sign-in through Google, GitHub and Facebook. Each provider is an adapter behind
//! the [`provider::OAuthProvider`] trait; only providers with credentials are
//! registered. A completed sign-in links the provider account to a local user and
//! issues the same refresh session as a password login.

pub mod facebook;
pub mod github;
pub mod google;
pub mod handlers;
pub mod linking;
pub mod provider;
pub mod registry;
pub mod routes;
pub mod store;


pub use registry::ProviderRegistry;
pub use routes::oauth_routes;
