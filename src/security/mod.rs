//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → limits.rs (bounded request body)
//!     → headers.rs (filter forwarded headers)
//!     → upstream fetch
//! Upstream response:
//!     → headers.rs (strip framing policy, inject permissive policy)
//!     → limits.rs (bounded buffering for rewritable bodies)
//! ```
//!
//! # Design Decisions
//! - Every buffered body has a ceiling
//! - Upstream framing restrictions never reach the browser

pub mod headers;
pub mod limits;
