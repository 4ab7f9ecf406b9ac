//! Script rewriting (best effort).
//!
//! Only literal, root-relative specifiers are touched:
//! - dynamic `import("/x")`
//! - static `import "/x"`, `import a from "/x"`, `export * from "/x"`
//! - string literals under common framework asset prefixes
//!
//! Computed or concatenated URLs are left to the runtime shim.

use std::sync::OnceLock;

use regex::bytes::{Captures, Regex};

use crate::proxy::PROXY_PREFIX;
use crate::rewrite::css::join;
use crate::rewrite::RewriteContext;

/// Root-relative prefixes bundlers commonly emit as plain literals.
pub const ASSET_PREFIXES: &[&str] = &["_next", "_nuxt", "assets", "static", "api"];

static DYNAMIC_IMPORT_REGEX: OnceLock<Regex> = OnceLock::new();
static STATIC_IMPORT_REGEX: OnceLock<Regex> = OnceLock::new();
static ASSET_REGEX: OnceLock<Regex> = OnceLock::new();

fn dynamic_import_regex() -> &'static Regex {
    DYNAMIC_IMPORT_REGEX.get_or_init(|| {
        Regex::new(r#"(\bimport\s*\(\s*)(["'`])(/(?:[^/"'`\s][^"'`\s]*)?)(["'`])"#)
            .expect("dynamic import regex is valid")
    })
}

fn static_import_regex() -> &'static Regex {
    STATIC_IMPORT_REGEX.get_or_init(|| {
        Regex::new(r#"(\b(?:from|import)\s*)(["'])(/(?:[^/"'\s][^"'\s]*)?)(["'])"#)
            .expect("static import regex is valid")
    })
}

fn asset_regex() -> &'static Regex {
    ASSET_REGEX.get_or_init(|| {
        let prefixes = ASSET_PREFIXES.join("|");
        Regex::new(&format!(r#"()(["'`])(/(?:{prefixes})/[^"'`\s]*)(["'`])"#))
            .expect("asset literal regex is valid")
    })
}

/// Rewrite a script body.
pub fn rewrite_js(input: &[u8], ctx: &RewriteContext) -> Vec<u8> {
    let Some(prefix) = ctx.root_prefix() else {
        return input.to_vec();
    };
    rewrite_with_prefix(input, prefix.as_bytes())
}

pub(crate) fn rewrite_with_prefix(input: &[u8], prefix: &[u8]) -> Vec<u8> {
    let mut out = input.to_vec();
    for regex in [dynamic_import_regex(), static_import_regex(), asset_regex()] {
        out = replace_quoted(regex, &out, prefix);
    }
    out
}

/// Apply a `(lead)(quote)(path)(quote)` pattern, prefixing the path.
fn replace_quoted(regex: &Regex, input: &[u8], prefix: &[u8]) -> Vec<u8> {
    regex
        .replace_all(input, |caps: &Captures| {
            let (lead, open, path, close) = (&caps[1], &caps[2], &caps[3], &caps[4]);
            if open != close || path.starts_with(PROXY_PREFIX.as_bytes()) {
                return caps[0].to_vec();
            }
            join(&[lead, open, prefix, path, close])
        })
        .into_owned()
}
