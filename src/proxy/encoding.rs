//! Proxied Path Encoding.
//!
//! A target URL maps onto the gateway as
//! `{origin}/api/proxy/{scheme}/{host[:port]}{path}{?query}{#fragment}`.
//! [`decode`] inverts [`encode`], and encoding a value that is already
//! under the prefix leaves it untouched.

use std::fmt;

use url::Url;

/// Path prefix every proxied URL lives under.
pub const PROXY_PREFIX: &str = "/api/proxy/";

/// Scheme and authority of the gateway itself, without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOrigin(String);

impl ProxyOrigin {
    /// Build an origin from a scheme and host (which may carry a port).
    pub fn new(scheme: &str, host: &str) -> Self {
        Self(format!(
            "{}://{}",
            scheme.to_ascii_lowercase(),
            host.trim_end_matches('/')
        ))
    }

    /// Accept a configured origin such as `https://gw.example.com/`.
    pub fn parse(value: &str) -> Option<Self> {
        let url = Url::parse(value).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        Some(Self::new(url.scheme(), &authority(&url)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{origin}/api/proxy/{scheme}/{authority}` for a given target, with no trailing slash.
    pub fn prefix_for(&self, target: &Url) -> Option<String> {
        let authority = authority(target)?;
        Some(format!(
            "{}{}{}/{}",
            self.0,
            PROXY_PREFIX,
            target.scheme(),
            authority
        ))
    }
}

impl fmt::Display for ProxyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host plus explicit (non-default) port.
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Encode an absolute http(s) target as a gateway URL.
///
/// Returns `None` for other schemes and host-less URLs.
pub fn encode(origin: &ProxyOrigin, target: &Url) -> Option<String> {
    if !matches!(target.scheme(), "http" | "https") {
        return None;
    }
    let mut out = origin.prefix_for(target)?;
    out.push_str(target.path());
    if let Some(query) = target.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = target.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    Some(out)
}

/// True when `value` already points into the gateway's proxy space.
pub fn is_proxied(origin: &ProxyOrigin, value: &str) -> bool {
    if value.starts_with(PROXY_PREFIX) || value == PROXY_PREFIX.trim_end_matches('/') {
        return true;
    }
    value
        .strip_prefix(origin.as_str())
        .map(|rest| rest.starts_with(PROXY_PREFIX) || rest.starts_with("/api/proxy?"))
        .unwrap_or(false)
}

/// Result of decoding a path-embedded target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// An http(s) target URL.
    Target(Url),
    /// The path names a ws/wss target.
    WebSocket(String),
}

/// Decode `.../api/proxy/{scheme}/{host}{path}?{query}` back into its target.
///
/// `path_and_query` is the raw request target; anything before the prefix is
/// ignored. Returns `None` when there is no prefix, the scheme is unknown, or
/// the host segment is empty.
pub fn decode(path_and_query: &str) -> Option<Decoded> {
    let idx = path_and_query.find(PROXY_PREFIX)?;
    let rest = &path_and_query[idx + PROXY_PREFIX.len()..];
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let mut segments = path.splitn(3, '/');
    let scheme = segments.next()?.to_ascii_lowercase();
    let host = segments.next().filter(|h| !h.is_empty())?;
    let tail = segments.next().unwrap_or("");

    let mut raw = format!("{scheme}://{host}/{tail}");
    if let Some(query) = query {
        raw.push('?');
        raw.push_str(query);
    }

    match scheme.as_str() {
        "http" | "https" => Url::parse(&raw).ok().map(Decoded::Target),
        "ws" | "wss" => Some(Decoded::WebSocket(raw)),
        _ => None,
    }
}
