//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Map an elapsed deadline to a distinct error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the wrapped future is dropped (and the
//!   upstream connection aborted) when the deadline fires
//! - No retries: a failure is reported immediately

use std::future::Future;
use std::time::Duration;

use crate::proxy::error::ProxyError;

/// Run `fut` under `deadline`, turning an elapsed timer into `ProxyError::UpstreamTimeout`.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, ProxyError>
where
    F: Future<Output = Result<T, ProxyError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProxyError::UpstreamTimeout(deadline)),
    }
}
