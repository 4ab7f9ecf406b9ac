//! Request-path error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Everything that can stop a single proxied request.
///
/// Rewriting problems are not listed: they degrade to the original body
/// instead of failing the response.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No target could be derived from the query, path or Referer.
    #[error("no target URL could be resolved from the request")]
    Resolution,

    /// The target uses ws: or wss:.
    #[error("websocket target '{0}' is not supported")]
    UnsupportedProtocol(String),

    /// The target uses a scheme other than http(s).
    #[error("unsupported target scheme '{0}'")]
    UnsupportedScheme(String),

    /// The inbound request body could not be read (or was too large).
    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),

    /// DNS, TLS, connection, redirect-limit or protocol failure.
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(#[from] reqwest::Error),

    /// The upstream deadline elapsed.
    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    /// A rewritable body exceeded the buffering ceiling.
    #[error("upstream body exceeds the {limit} byte rewrite limit")]
    ResponseTooLarge { limit: usize },
}

impl ProxyError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Resolution => "resolution",
            ProxyError::UnsupportedProtocol(_) => "unsupported_protocol",
            ProxyError::UnsupportedScheme(_) => "unsupported_scheme",
            ProxyError::RequestBody(_) => "request_body",
            ProxyError::UpstreamFetch(e) if e.is_timeout() => "timeout",
            ProxyError::UpstreamFetch(e) if e.is_redirect() => "redirect_limit",
            ProxyError::UpstreamFetch(e) if e.is_connect() => "connect",
            ProxyError::UpstreamFetch(_) => "fetch",
            ProxyError::UpstreamTimeout(_) => "timeout",
            ProxyError::ResponseTooLarge { .. } => "too_large",
        }
    }

    /// Whether the failure came from the target origin rather than the browser's request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ProxyError::UpstreamFetch(_) | ProxyError::UpstreamTimeout(_) | ProxyError::ResponseTooLarge { .. }
        )
    }
}
