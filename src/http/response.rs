//! Error responses.
//!
//! Every `ProxyError` becomes a JSON body `{"error": "..."}` with a short,
//! fixed message. Internal detail stays in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::proxy::ProxyError;

impl ProxyError {
    /// Status code returned to the browser.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Resolution
            | ProxyError::UnsupportedProtocol(_)
            | ProxyError::UnsupportedScheme(_)
            | ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamFetch(_) | ProxyError::UpstreamTimeout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::ResponseTooLarge { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Client-facing message.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::Resolution => "Missing 'url' query parameter",
            ProxyError::UnsupportedProtocol(_) => "WebSocket protocols not supported",
            ProxyError::UnsupportedScheme(_) => "Unsupported URL scheme",
            ProxyError::RequestBody(_) => "Failed to read request body",
            ProxyError::UpstreamFetch(_) | ProxyError::UpstreamTimeout(_) => {
                "Failed to fetch the requested site"
            }
            ProxyError::ResponseTooLarge { .. } => "Upstream response too large to rewrite",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
