//! Proxy pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → target.rs (url param | path-embedded | Referer fallback)
//!     → upstream.rs (forward method/headers/body, follow redirects)
//!     → security::headers (sanitize response headers)
//!     → rewrite (classify & rewrite body)
//! ```
//!
//! # Design Decisions
//! - Stateless per request: nothing survives the response
//! - encoding.rs is the single definition of the gateway URL shape

pub mod encoding;
pub mod error;
pub mod target;
pub mod upstream;

pub use encoding::{ProxyOrigin, PROXY_PREFIX};
pub use error::ProxyError;
pub use upstream::{UpstreamClient, UpstreamRequest};
