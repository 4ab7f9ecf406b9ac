//! Embedding gateway library.
//!
//! A transforming HTTP proxy that serves third-party sites from
//! `/api/proxy/{scheme}/{host}{path}` so they can be framed by any page.

pub mod config;
pub mod http;
pub mod proxy;
pub mod rewrite;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
