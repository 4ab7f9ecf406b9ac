//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline on headers + buffered body)
//!     → on failure: reported to the client immediately
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Redirect hops are bounded by the upstream client policy
//! - No retries: the gateway never replays a browser's request

pub mod timeouts;

pub use timeouts::with_deadline;
