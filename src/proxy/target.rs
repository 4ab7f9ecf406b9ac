//! Target resolution.
//!
//! # Responsibilities
//! - Derive the absolute URL to fetch from an inbound request
//! - Derive the gateway's own origin from forwarded headers
//!
//! # Resolution Order
//! 1. `?url=<encoded>` query parameter
//! 2. Path-embedded form `/api/proxy/{scheme}/{host}/{path}`
//! 3. Referer fallback: the Referer's target, with the current request's
//!    query parameters (except `url`) merged onto it
//!
//! The first form that yields a URL wins. ws/wss targets are rejected
//! before anything is fetched.

use axum::http::{header, HeaderMap, Uri};
use url::Url;

use crate::config::OriginConfig;
use crate::proxy::encoding::{self, Decoded, ProxyOrigin};
use crate::proxy::error::ProxyError;

const URL_PARAM: &str = "url";

/// Resolve the target URL for a request.
pub fn resolve(uri: &Uri, headers: &HeaderMap) -> Result<Url, ProxyError> {
    let query = uri.query().unwrap_or("");

    if let Some(raw) = query_param(query, URL_PARAM) {
        let target = Url::parse(raw.trim()).map_err(|_| ProxyError::Resolution)?;
        return check_scheme(target);
    }

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    match encoding::decode(path_and_query) {
        Some(Decoded::Target(target)) => return Ok(target),
        Some(Decoded::WebSocket(raw)) => return Err(ProxyError::UnsupportedProtocol(raw)),
        None => {}
    }

    match from_referer(headers, query) {
        Some(target) => check_scheme(target),
        None => Err(ProxyError::Resolution),
    }
}

fn check_scheme(target: Url) -> Result<Url, ProxyError> {
    match target.scheme() {
        "http" | "https" if target.host_str().is_some() => Ok(target),
        "http" | "https" => Err(ProxyError::Resolution),
        "ws" | "wss" => Err(ProxyError::UnsupportedProtocol(target.to_string())),
        other => Err(ProxyError::UnsupportedScheme(other.to_string())),
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Recover the parent target from the Referer and merge the current query onto it.
fn from_referer(headers: &HeaderMap, current_query: &str) -> Option<Url> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let referer = Url::parse(referer).ok()?;

    let mut parent = match referer
        .query_pairs()
        .find(|(key, _)| key == URL_PARAM)
        .map(|(_, value)| value.into_owned())
    {
        Some(raw) => Url::parse(&raw).ok()?,
        None => {
            let mut path_and_query = referer.path().to_string();
            if let Some(q) = referer.query() {
                path_and_query.push('?');
                path_and_query.push_str(q);
            }
            match encoding::decode(&path_and_query)? {
                Decoded::Target(url) => url,
                Decoded::WebSocket(_) => return None,
            }
        }
    };

    let extra: Vec<(String, String)> = url::form_urlencoded::parse(current_query.as_bytes())
        .filter(|(key, _)| key != URL_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if extra.is_empty() {
        return Some(parent);
    }

    let mut pairs: Vec<(String, String)> = parent.query_pairs().into_owned().collect();
    for (key, value) in extra {
        pairs.retain(|(existing, _)| existing != &key);
        pairs.push((key, value));
    }
    parent.query_pairs_mut().clear().extend_pairs(pairs);
    Some(parent)
}

/// Derive the gateway origin for this request.
///
/// A configured `public_origin` wins; otherwise X-Forwarded-Proto/Host (when
/// trusted), then Host, then `fallback_host`.
pub fn proxy_origin(headers: &HeaderMap, config: &OriginConfig, fallback_host: &str) -> ProxyOrigin {
    if let Some(origin) = config.public_origin.as_deref().and_then(ProxyOrigin::parse) {
        return origin;
    }

    let forwarded = |name: &str| {
        if !config.trust_forwarded_headers {
            return None;
        }
        first_token(headers, name)
    };

    let scheme = forwarded("x-forwarded-proto")
        .filter(|s| s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https"))
        .unwrap_or_else(|| config.default_scheme.clone());
    let host = forwarded("x-forwarded-host")
        .or_else(|| first_token(headers, header::HOST.as_str()))
        .unwrap_or_else(|| fallback_host.to_string());

    ProxyOrigin::new(&scheme, &host)
}

fn first_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
