//! Client IP resolution from proxy headers.
//!
//! The server is expected to sit behind a reverse proxy or CDN, so the
//! socket address is usually the proxy's. Headers are consulted in order:
//! `x-forwarded-for` (first hop), `x-real-ip`, then `cf-connecting-ip`.
//! When none is present the client is keyed as `"unknown"`; rate limiting
//! then degrades to one shared bucket, which fails closed rather than open.

use axum::http::HeaderMap;

/// Key used when no proxy header identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

const FORWARDED_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Resolves the client IP from proxy headers.
///
/// `x-forwarded-for` may carry a comma-separated hop list; only the first
/// entry (the original client) is used.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> String {
    for name in FORWARDED_HEADERS {
        let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        let first_hop = value.split(',').next().unwrap_or(value).trim();
        if !first_hop.is_empty() {
            return first_hop.to_string();
        }
    }
    UNKNOWN_CLIENT.to_string()
}

/// The `user-agent` header, or an empty string.
#[must_use]
pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
