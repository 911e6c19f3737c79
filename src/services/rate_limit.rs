// src/services/rate_limit.rs
//! Fixed-window request counting per client IP.
//!
//! Registration and login get their own tight buckets; every other route shares
//! the general bucket. Counters live in memory and are swept periodically.

use std::collections::HashMap;
use std::env;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitBucket {
    Register,
    Login,
    General,
}

impl RateLimitBucket {
    pub fn for_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/auth/register" => RateLimitBucket::Register,
            "/auth/login" => RateLimitBucket::Login,
            _ => RateLimitBucket::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitBucket::Register => "register",
            RateLimitBucket::Login => "login",
            RateLimitBucket::General => "general",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub register_limit: u32,
    pub login_limit: u32,
    pub general_limit: u32,
    pub window_seconds: u64,
    pub whitelist_ips: Vec<String>,
    /// Peers whose forwarding headers are believed; everyone else is keyed by socket address
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            register_limit: 5,  // 5 sign-ups per window per IP
            login_limit: 10,    // 10 login attempts per window per IP
            general_limit: 100, // everything else
            window_seconds: 15 * 60,
            whitelist_ips: Vec::new(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = parse_env::<u32>("RATE_LIMIT_REGISTER") {
            config.register_limit = val;
        }
        if let Some(val) = parse_env::<u32>("RATE_LIMIT_LOGIN") {
            config.login_limit = val;
        }
        if let Some(val) = parse_env::<u32>("RATE_LIMIT_GENERAL") {
            config.general_limit = val;
        }
        if let Some(val) = parse_env::<u64>("RATE_LIMIT_WINDOW_SECONDS") {
            config.window_seconds = val.max(1);
        }

        // RATE_LIMIT_WHITELIST_IPS - comma-separated list of exempt IPs
        if let Ok(whitelist) = env::var("RATE_LIMIT_WHITELIST_IPS") {
            config.whitelist_ips = whitelist
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // RATE_LIMIT_TRUSTED_PROXIES - comma-separated reverse proxy addresses
        if let Ok(proxies) = env::var("RATE_LIMIT_TRUSTED_PROXIES") {
            config.trusted_proxies = parse_ip_list(&proxies);
        }

        config
    }

    pub fn limit_for(&self, bucket: RateLimitBucket) -> u32 {
        match bucket {
            RateLimitBucket::Register => self.register_limit,
            RateLimitBucket::Login => self.login_limit,
            RateLimitBucket::General => self.general_limit,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(val) => Some(val),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring unparseable rate limit setting");
            None
        }
    }
}

fn parse_ip_list(raw: &str) -> Vec<IpAddr> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                warn!(value = %s, "Ignoring invalid trusted proxy address");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
struct RateLimitState {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, window: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u64 },
}

#[derive(Debug, Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    rate_limiter: Arc<RwLock<HashMap<String, RateLimitState>>>,
}

impl RateLimitService {
    pub fn new(config: RateLimitConfig) -> Self {
        info!(
            register_limit = config.register_limit,
            login_limit = config.login_limit,
            general_limit = config.general_limit,
            window_seconds = config.window_seconds,
            whitelist_ips = ?config.whitelist_ips,
            trusted_proxies = ?config.trusted_proxies,
            "Initializing RateLimitService"
        );
        Self {
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn is_trusted_proxy(&self, ip: &IpAddr) -> bool {
        self.config.trusted_proxies.contains(ip)
    }

    fn is_whitelisted(&self, ip: &str) -> bool {
        self.config.whitelist_ips.iter().any(|w| w == ip)
    }

    /// Count one request from `ip` against `bucket`
    pub async fn check_rate_limit(&self, bucket: RateLimitBucket, ip: &str) -> RateLimitResult {
        if self.is_whitelisted(ip) {
            return RateLimitResult::Allowed;
        }

        let key = format!("{}:{}", bucket.as_str(), ip);
        self.check_limit_for_key(&key, self.config.limit_for(bucket), Instant::now())
            .await
    }

    async fn check_limit_for_key(&self, key: &str, limit: u32, now: Instant) -> RateLimitResult {
        let window = self.config.window();
        let mut limiter = self.rate_limiter.write().await;

        let state = limiter
            .entry(key.to_string())
            .or_insert_with(|| RateLimitState::new(now));

        if state.is_expired(window, now) {
            *state = RateLimitState::new(now);
        }

        if state.count >= limit {
            let elapsed = now.saturating_duration_since(state.window_start);
            let retry_after = window.saturating_sub(elapsed).as_secs().max(1);
            return RateLimitResult::Limited { retry_after };
        }

        state.count += 1;
        RateLimitResult::Allowed
    }

    /// Start background task sweeping expired counters once per window
    pub fn start_cleanup_task(service: Arc<RateLimitService>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(service.config.window());
            loop {
                interval.tick().await;
                service.cleanup_expired().await;
            }
        });
    }

    /// Drop counters whose window has passed. Returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Instant::now()).await
    }

    async fn cleanup_expired_at(&self, now: Instant) -> usize {
        let window = self.config.window();
        let mut limiter = self.rate_limiter.write().await;
        let before = limiter.len();
        limiter.retain(|_, state| !state.is_expired(window, now));
        let removed = before - limiter.len();
        debug!(removed = removed, remaining = limiter.len(), "Cleaned up expired rate limit entries");
        removed
    }
}
