//! Body size limits.
//!
//! # Responsibilities
//! - Enforce maximum inbound request body size before forwarding
//! - Enforce maximum upstream body size before buffering for rewriting
//!
//! # Design Decisions
//! - A declared Content-Length over the ceiling is rejected before any read
//! - Undeclared lengths are counted chunk by chunk and cut off at the ceiling

use axum::body::{Body, Bytes};

use crate::proxy::error::ProxyError;

/// Buffer the inbound request body, failing past `limit` bytes.
pub async fn read_request_body(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(ProxyError::RequestBody)
}

/// Buffer an upstream response body, failing past `limit` bytes.
pub async fn read_upstream_body(mut response: reqwest::Response, limit: usize) -> Result<Bytes, ProxyError> {
    check_declared_length(response.content_length(), limit)?;

    let mut buf = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    while let Some(chunk) = response.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Err(ProxyError::ResponseTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

fn check_declared_length(declared: Option<u64>, limit: usize) -> Result<(), ProxyError> {
    match declared {
        Some(len) if len > limit as u64 => Err(ProxyError::ResponseTooLarge { limit }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_length_checked_against_limit() {
        assert!(check_declared_length(None, 10).is_ok());
        assert!(check_declared_length(Some(10), 10).is_ok());
        assert!(matches!(
            check_declared_length(Some(11), 10),
            Err(ProxyError::ResponseTooLarge { limit: 10 })
        ));
    }

    #[tokio::test]
    async fn request_body_over_limit_fails() {
        let body = Body::from(vec![b'x'; 64]);
        assert!(matches!(read_request_body(body, 16).await, Err(ProxyError::RequestBody(_))));

        let body = Body::from("hello");
        assert_eq!(read_request_body(body, 16).await.unwrap(), Bytes::from("hello"));
    }
}
