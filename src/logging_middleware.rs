// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use serde_json::Value;
use tracing::{debug, Level};

/// JSON keys whose values never reach the logs
const REDACTED_KEYS: &[&str] = &["password", "accessToken", "access_token", "token", "refreshToken"];
const REDACTED: &str = "[REDACTED]";

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.as_str()) {
                    *val = Value::String(REDACTED.to_string());
                } else {
                    redact(val);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Render a body for logging; JSON is redacted, anything else is summarized
fn loggable_body(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut json) => {
            redact(&mut json);
            Some(serde_json::to_string(&json).unwrap_or_default())
        }
        Err(_) => Some(format!("<{} bytes>", bytes.len())),
    }
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !tracing::enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(request_body) = loggable_body(&bytes) {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            request_body = %request_body,
            "📥 Request"
        );
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(response_body) = loggable_body(&bytes) {
        debug!(
            status = %parts.status,
            response_body = %response_body,
            "📤 Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sensitive_fields_are_redacted() {
        let body = br#"{"email":"a@b.co","password":"Secret123","nested":{"token":"t"}}"#;
        let logged = loggable_body(body).unwrap();

        assert!(!logged.contains("Secret123"));
        assert!(logged.contains("a@b.co"));
        let parsed: Value = serde_json::from_str(&logged).unwrap();
        assert_eq!(parsed["password"], REDACTED);
        assert_eq!(parsed["nested"]["token"], REDACTED);
    }

    #[test]
    fn test_access_token_redacted_in_arrays() {
        let mut value = json!([{ "accessToken": "eyJ..." }, { "ok": true }]);
        redact(&mut value);
        assert_eq!(value[0]["accessToken"], REDACTED);
        assert_eq!(value[1]["ok"], true);
    }

    #[test]
    fn test_non_json_body_is_summarized() {
        assert_eq!(loggable_body(b"plain text"), Some("<10 bytes>".to_string()));
        assert_eq!(loggable_body(b""), None);
    }
}
