//! Client Runtime Shim.
//!
//! The shim is a browser script injected into every rewritten document. It
//! wraps fetch, XHR, beacons, EventSource, workers, form submission and link
//! clicks so URLs the static passes missed still go through the gateway.

use crate::rewrite::RewriteContext;

const TEMPLATE: &str = include_str!("shim.js");
const TARGET_PLACEHOLDER: &str = "__EMBED_PROXY_TARGET__";
const ORIGIN_PLACEHOLDER: &str = "__EMBED_PROXY_ORIGIN__";

/// Render the shim script body with the target URL and gateway origin baked in.
pub fn render(ctx: &RewriteContext) -> String {
    TEMPLATE
        .replace(TARGET_PLACEHOLDER, &js_string(ctx.base().as_str()))
        .replace(ORIGIN_PLACEHOLDER, &js_string(ctx.origin().as_str()))
}

/// Render the shim wrapped in a `<script>` element.
pub fn script_tag(ctx: &RewriteContext) -> String {
    format!("<script>{}</script>", render(ctx))
}

/// A JS string literal that cannot terminate the surrounding `<script>`.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string().replace('<', "\\u003c")
}
