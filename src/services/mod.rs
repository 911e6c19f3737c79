// Services module - in-process services shared across routes

pub mod rate_limit;

pub use rate_limit::{RateLimitConfig, RateLimitService};
