//! Content rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! upstream Content-Type
//!     → ContentClass::classify (once per response)
//!     → html.rs | css.rs | js.rs | passthrough
//!     → rewritten bytes (or the original bytes on failure)
//! ```
//!
//! # Design Decisions
//! - A `RewriteContext` is built per response and only read by rewriters
//! - CSS/JS passes are best effort; shim.rs is the runtime backstop
//! - A rewriter failure never fails the response

pub mod css;
pub mod html;
pub mod js;
pub mod shim;

use std::fmt;

use axum::body::Bytes;
use thiserror::Error;
use url::Url;

use crate::observability::metrics;
use crate::proxy::encoding::{self, ProxyOrigin};

/// Content-Type Class driving dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentClass {
    Html,
    Css,
    Js,
    Other,
}

impl ContentClass {
    /// Classify a Content-Type header value (case-insensitive substring match).
    pub fn classify(content_type: Option<&str>) -> Self {
        let Some(ct) = content_type else {
            return ContentClass::Other;
        };
        let ct = ct.to_ascii_lowercase();
        if ct.contains("text/html") {
            ContentClass::Html
        } else if ct.contains("text/css") {
            ContentClass::Css
        } else if ct.contains("javascript") || ct.contains("ecmascript") || ct.contains("module") {
            ContentClass::Js
        } else {
            ContentClass::Other
        }
    }

    /// Whether the body must be buffered and rewritten.
    pub fn is_rewritable(self) -> bool {
        !matches!(self, ContentClass::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentClass::Html => "html",
            ContentClass::Css => "css",
            ContentClass::Js => "js",
            ContentClass::Other => "other",
        }
    }
}

impl fmt::Display for ContentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure inside a rewriter.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("html rewriting failed: {0}")]
    Html(#[from] lol_html::errors::RewritingError),
}

/// Schemes whose references are never rewritten.
const SKIPPED_SCHEMES: &[&str] = &["data:", "javascript:", "mailto:", "blob:", "about:", "tel:"];

/// Per-response rewrite inputs: the gateway origin, the document's base URL
/// and the declared charset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    origin: ProxyOrigin,
    base: Url,
    charset: Option<String>,
}

impl RewriteContext {
    pub fn new(origin: ProxyOrigin, base: Url) -> Self {
        Self {
            origin,
            base,
            charset: None,
        }
    }

    /// Take the charset from an upstream Content-Type value.
    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.charset = content_type.and_then(charset_param);
        self
    }

    /// Charset label declared by the upstream, if any.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn origin(&self) -> &ProxyOrigin {
        &self.origin
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `{origin}/api/proxy/{scheme}/{host}` for root-relative references.
    pub fn root_prefix(&self) -> Option<String> {
        self.origin.prefix_for(&self.base)
    }

    /// Rewrite a reference relative to the document base.
    pub fn rewrite(&self, raw: &str) -> Option<String> {
        self.rewrite_against(raw, &self.base)
    }

    /// Rewrite a reference relative to `base`.
    ///
    /// Returns `None` when the value must stay as it is: empty, hash-only,
    /// a skipped scheme, already proxied, or unresolvable.
    pub fn rewrite_against(&self, raw: &str, base: &Url) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() || value.starts_with('#') || has_skipped_scheme(value) {
            return None;
        }
        if encoding::is_proxied(&self.origin, value) {
            return None;
        }
        let resolved = base.join(value).ok()?;
        encoding::encode(&self.origin, &resolved)
    }
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        })
        .filter(|label| !label.is_empty())
}

fn has_skipped_scheme(value: &str) -> bool {
    SKIPPED_SCHEMES.iter().any(|scheme| {
        value
            .get(..scheme.len())
            .map(|head| head.eq_ignore_ascii_case(scheme))
            .unwrap_or(false)
    })
}

/// Rewrite a buffered body, returning the original bytes if rewriting fails.
pub fn rewrite_body(class: ContentClass, body: Bytes, ctx: &RewriteContext) -> Bytes {
    if body.is_empty() {
        return body;
    }
    let result = match class {
        ContentClass::Html => html::rewrite_html(&body, ctx),
        ContentClass::Css => Ok(css::rewrite_css(&body, ctx)),
        ContentClass::Js => Ok(js::rewrite_js(&body, ctx)),
        ContentClass::Other => return body,
    };

    match result {
        Ok(rewritten) => Bytes::from(rewritten),
        Err(e) => {
            tracing::warn!(
                class = %class,
                base = %ctx.base(),
                error = %e,
                "Rewrite failed; serving original body"
            );
            metrics::record_rewrite_fallback(class);
            body
        }
    }
}
