//! Stylesheet rewriting.
//!
//! Root-relative `url(/...)` references and `@import "/..."` strings are
//! pointed at the gateway. Anything else (absolute, relative, computed) is
//! left for the browser to resolve.

use std::sync::OnceLock;

use regex::bytes::{Captures, Regex};

use crate::proxy::PROXY_PREFIX;
use crate::rewrite::RewriteContext;

static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static IMPORT_REGEX: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)url\(\s*(["']?)(/(?:[^/"')\s][^"')\s]*)?)(["']?)\s*\)"#)
            .expect("CSS url() regex is valid")
    })
}

fn import_regex() -> &'static Regex {
    IMPORT_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)(@import\s+)(["'])(/(?:[^/"'\s][^"'\s]*)?)(["'])"#)
            .expect("CSS @import regex is valid")
    })
}

/// Rewrite a stylesheet body.
pub fn rewrite_css(input: &[u8], ctx: &RewriteContext) -> Vec<u8> {
    let Some(prefix) = ctx.root_prefix() else {
        return input.to_vec();
    };
    rewrite_with_prefix(input, prefix.as_bytes())
}

pub(crate) fn rewrite_with_prefix(input: &[u8], prefix: &[u8]) -> Vec<u8> {
    let pass = url_regex().replace_all(input, |caps: &Captures| {
        let (open, path, close) = (&caps[1], &caps[2], &caps[3]);
        if open != close || path.starts_with(PROXY_PREFIX.as_bytes()) {
            return caps[0].to_vec();
        }
        join(&[b"url(", open, prefix, path, close, b")"])
    });

    import_regex()
        .replace_all(&pass, |caps: &Captures| {
            let (lead, open, path, close) = (&caps[1], &caps[2], &caps[3], &caps[4]);
            if open != close || path.starts_with(PROXY_PREFIX.as_bytes()) {
                return caps[0].to_vec();
            }
            join(&[lead, open, prefix, path, close])
        })
        .into_owned()
}

pub(crate) fn join(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}
