//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, redirect bound)
//! - Validate addresses and the optional public origin
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// Upper bound accepted for `upstream.max_redirects`.
pub const MAX_REDIRECT_BOUND: usize = 30;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("upstream.max_redirects must be at most {bound} (got {0})", bound = MAX_REDIRECT_BOUND)]
    TooManyRedirects(usize),

    #[error("origin.default_scheme must be http or https (got '{0}')")]
    InvalidScheme(String),

    #[error("origin.public_origin must be an absolute http(s) origin without a path (got '{0}')")]
    InvalidPublicOrigin(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let non_zero = [
        ("listener.max_concurrent_requests", config.listener.max_concurrent_requests as u64),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.read_idle_secs", config.timeouts.read_idle_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("limits.max_request_body_bytes", config.limits.max_request_body_bytes as u64),
        ("limits.max_rewrite_bytes", config.limits.max_rewrite_bytes as u64),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.upstream.max_redirects > MAX_REDIRECT_BOUND {
        errors.push(ValidationError::TooManyRedirects(config.upstream.max_redirects));
    }

    let scheme = config.origin.default_scheme.as_str();
    if scheme != "http" && scheme != "https" {
        errors.push(ValidationError::InvalidScheme(scheme.to_string()));
    }

    if let Some(origin) = &config.origin.public_origin {
        if !is_bare_origin(origin) {
            errors.push(ValidationError::InvalidPublicOrigin(origin.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn is_bare_origin(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}
