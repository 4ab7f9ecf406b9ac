//! Header manipulation.
//!
//! # Responsibilities
//! - Filter the browser's headers before they are forwarded upstream
//! - Strip framing, encoding and length headers from upstream responses
//! - Inject a permissive frame/content policy so the page can be embedded
//!
//! # Design Decisions
//! - Matching is case-insensitive (`HeaderName` is always lowercase)
//! - Status codes are never touched here
//! - Content-Type is preserved so passthrough bodies keep their type

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Request headers never forwarded upstream.
///
/// `host` belongs to the gateway, `content-length` goes stale once the body
/// is re-sent, and `accept-encoding` is dropped so the upstream answers with
/// an uncompressed, rewritable body. The rest are hop-by-hop.
const STRIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "accept-encoding",
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Upstream response headers never passed to the browser.
const STRIPPED_RESPONSE_HEADERS: &[&str] = &[
    "x-frame-options",
    "content-security-policy",
    "content-security-policy-report-only",
    "content-length",
    "content-encoding",
    "transfer-encoding",
];

/// Frame option injected on every response.
pub const FRAME_OPTIONS: &str = "ALLOW-FROM *";

/// Policy injected on every response.
pub const PERMISSIVE_CSP: &str = "default-src * 'unsafe-inline' 'unsafe-eval' data: blob:; \
script-src * 'unsafe-inline' 'unsafe-eval' data: blob:; \
style-src * 'unsafe-inline' data: blob:; \
img-src * data: blob:; \
media-src * data: blob:; \
font-src * data: blob:; \
connect-src * data: blob:; \
frame-src * data: blob:; \
worker-src * data: blob:; \
frame-ancestors *";

/// Build the header set forwarded upstream from the browser's headers.
pub fn forwarded_request_headers(incoming: &HeaderMap, default_user_agent: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len());
    for (name, value) in incoming {
        if !STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }

    if !headers.contains_key(header::USER_AGENT) {
        if let Some(ua) = default_user_agent.and_then(|ua| HeaderValue::from_str(ua).ok()) {
            headers.insert(header::USER_AGENT, ua);
        }
    }
    headers
}

/// Sanitize upstream response headers for an embeddable response.
pub fn sanitize_response_headers(upstream: &HeaderMap, default_cache_control: &str) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len() + 3);
    for (name, value) in upstream {
        if !STRIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }

    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static(FRAME_OPTIONS));
    headers.insert(
        HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static(PERMISSIVE_CSP),
    );

    if !headers.contains_key(header::CACHE_CONTROL) {
        match HeaderValue::from_str(default_cache_control) {
            Ok(value) => {
                headers.insert(header::CACHE_CONTROL, value);
            }
            Err(_) => tracing::warn!(
                value = %default_cache_control,
                "Configured default Cache-Control is not a valid header value"
            ),
        }
    }
    headers
}
