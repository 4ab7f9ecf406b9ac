//! Outbound fetch to the target origin.
//!
//! # Responsibilities
//! - Forward the browser's method, filtered headers and buffered body
//! - Follow redirects server-side, bounded by `upstream.max_redirects`
//! - Bound connect time, time-to-headers and idle reads
//!
//! # Design Decisions
//! - The returned response is the final hop; redirect chains never reach the browser
//! - Network failures surface immediately as `ProxyError::UpstreamFetch`
//! - Dropping the fetch future (client disconnect) aborts the upstream connection

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::GatewayConfig;
use crate::proxy::error::ProxyError;
use crate::resilience::with_deadline;
use crate::security::headers::forwarded_request_headers;

/// A request about to be sent upstream.
#[derive(Debug)]
pub struct UpstreamRequest<'a> {
    pub method: Method,
    pub target: Url,
    pub headers: &'a HeaderMap,
    pub body: Option<Bytes>,
}

/// HTTP client for target origins.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    deadline: Duration,
    default_user_agent: Option<String>,
}

impl UpstreamClient {
    /// Build a client from the gateway configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(config.upstream.max_redirects))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .read_timeout(Duration::from_secs(config.timeouts.read_idle_secs))
            .build()?;

        Ok(Self {
            client,
            deadline: Duration::from_secs(config.timeouts.upstream_secs),
            default_user_agent: config.upstream.default_user_agent.clone(),
        })
    }

    /// Deadline applied to the fetch and to any buffered body read.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Send the request and wait for the final response headers.
    pub async fn fetch(&self, request: UpstreamRequest<'_>) -> Result<reqwest::Response, ProxyError> {
        let headers = forwarded_request_headers(request.headers, self.default_user_agent.as_deref());

        let mut builder = self
            .client
            .request(request.method.clone(), request.target.clone())
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        tracing::debug!(method = %request.method, target = %request.target, "Fetching upstream");
        with_deadline(self.deadline, async { Ok(builder.send().await?) }).await
    }
}

/// Whether a method carries a body worth forwarding.
pub fn forwards_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}
