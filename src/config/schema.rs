//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the embedding gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Body size ceilings.
    pub limits: LimitsConfig,

    /// Outbound client behaviour.
    pub upstream: UpstreamConfig,

    /// How the gateway's own origin is derived.
    pub origin: OriginConfig,

    /// Response header policy.
    pub headers: HeadersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests handled concurrently (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_concurrent_requests: 1024,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for upstream response headers plus any buffered body, in seconds.
    pub upstream_secs: u64,

    /// Maximum idle gap between body chunks of a streamed response, in seconds.
    pub read_idle_secs: u64,

    /// Whole-request timeout enforced by the HTTP layer, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            upstream_secs: 30,
            read_idle_secs: 30,
            request_secs: 60,
        }
    }
}

/// Body size ceilings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest inbound request body forwarded upstream.
    pub max_request_body_bytes: usize,

    /// Largest HTML/CSS/JS response buffered for rewriting.
    pub max_rewrite_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 10 * 1024 * 1024, // 10MB
            max_rewrite_bytes: 20 * 1024 * 1024,      // 20MB
        }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Maximum redirect hops followed before the fetch fails.
    pub max_redirects: usize,

    /// User-Agent sent when the browser did not supply one.
    pub default_user_agent: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            default_user_agent: None,
        }
    }
}

/// Proxy origin derivation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OriginConfig {
    /// Fixed public origin (e.g. "https://gw.example.com"). Overrides headers.
    pub public_origin: Option<String>,

    /// Scheme used when no forwarded-proto header is present.
    pub default_scheme: String,

    /// Honour X-Forwarded-Proto / X-Forwarded-Host.
    pub trust_forwarded_headers: bool,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            public_origin: None,
            default_scheme: "http".to_string(),
            trust_forwarded_headers: true,
        }
    }
}

/// Response header policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HeadersConfig {
    /// Cache-Control applied when the upstream response has none.
    pub default_cache_control: String,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            default_cache_control: "public, max-age=3600".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
