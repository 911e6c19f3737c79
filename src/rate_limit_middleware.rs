// rate_limit_middleware.rs
use crate::services::rate_limit::{RateLimitBucket, RateLimitResult, RateLimitService};
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitErrorResponse {
    error: String,
    code: String,
    retry_after: u64,
}

/// Client address used as the rate limit key
///
/// Forwarding headers are only believed when the socket peer is a trusted proxy.
/// The `X-Forwarded-For` chain is then walked right to left past trusted hops, so
/// addresses a client prepends itself are never reached.
fn client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    is_trusted: impl Fn(&IpAddr) -> bool,
) -> Option<String> {
    let peer = peer?;
    if !is_trusted(&peer) {
        return Some(peer.to_string());
    }

    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let hops: Vec<IpAddr> = forwarded
            .split(',')
            .filter_map(|hop| hop.trim().parse().ok())
            .collect();
        if let Some(client) = hops.iter().rev().find(|ip| !is_trusted(ip)).or(hops.first()) {
            return Some(client.to_string());
        }
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
    {
        return Some(real_ip.to_string());
    }

    Some(peer.to_string())
}

fn too_many_requests(bucket: RateLimitBucket, retry_after: u64) -> Response {
    let message = match bucket {
        RateLimitBucket::Register => "Too many sign-up attempts. Please try again later.",
        RateLimitBucket::Login => "Too many login attempts. Please try again later.",
        RateLimitBucket::General => "Too many requests. Please try again later.",
    };

    let error_response = RateLimitErrorResponse {
        error: message.to_string(),
        code: "RATE_LIMIT_EXCEEDED".to_string(),
        retry_after,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();
    if let Ok(retry_header) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(RETRY_AFTER, retry_header);
    }
    response
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    Extension(rate_limit_service): Extension<Arc<RateLimitService>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let ip_address = client_ip(request.headers(), peer, |ip| {
        rate_limit_service.is_trusted_proxy(ip)
    })
    .unwrap_or_else(|| "unknown".to_string());
    let path = request.uri().path().to_string();
    let bucket = RateLimitBucket::for_path(&path);

    match rate_limit_service.check_rate_limit(bucket, &ip_address).await {
        RateLimitResult::Allowed => {
            debug!(
                ip = %ip_address,
                path = %path,
                bucket = bucket.as_str(),
                "Request allowed by rate limiter"
            );
            next.run(request).await
        }
        RateLimitResult::Limited { retry_after } => {
            warn!(
                ip = %ip_address,
                path = %path,
                bucket = bucket.as_str(),
                retry_after = retry_after,
                "Request blocked by rate limiter"
            );
            too_many_requests(bucket, retry_after)
        }
    }
}
