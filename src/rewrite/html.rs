//! Document rewriting.
//!
//! # Responsibilities
//! - Point `href`/`src`/`action`/`srcset` references at the gateway
//! - Run the CSS and JS passes over inline `<style>` and `<script>` text
//! - Inject the runtime shim as the first child of `<head>`
//!
//! # Design Decisions
//! - Streaming rewriter (lol_html): unmodified bytes, entities and raw text
//!   are emitted exactly as received
//! - Inline text is planned in a read-only pass first; only nodes the CSS or
//!   JS pass actually changes are re-emitted, in the document's encoding
//! - `<base href>` moves the resolution base for every later reference
//! - Non-strict parsing; malformed markup is passed through, not rejected

use std::cell::{Cell, RefCell};
use std::error::Error;

use encoding_rs::Encoding;
use lol_html::html_content::{ContentType, Element, TextChunk};
use lol_html::{element, text, AsciiCompatibleEncoding, HtmlRewriter, Settings};
use url::Url;

use crate::rewrite::{css, js, shim, RewriteContext, RewriteError};

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Replacement text per inline `<style>`/`<script>` node, in document order.
/// `None` marks a node the passes leave unchanged.
#[derive(Debug, Default)]
struct InlinePlan {
    styles: Vec<Option<String>>,
    scripts: Vec<Option<String>>,
}

/// Rewrite an HTML document.
pub fn rewrite_html(input: &[u8], ctx: &RewriteContext) -> Result<Vec<u8>, RewriteError> {
    let encoding = document_encoding(ctx);
    let plan = plan_inline(input, ctx, encoding)?;

    let shim_tag = shim::script_tag(ctx);
    let base = RefCell::new(ctx.base().clone());
    let injected = Cell::new(false);
    let style_index = Cell::new(0);
    let script_index = Cell::new(0);

    let mut output = Vec::with_capacity(input.len() + shim_tag.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("head", |el| {
                    if !injected.replace(true) {
                        el.prepend(&shim_tag, ContentType::Html);
                    }
                    Ok(())
                }),
                element!("base[href]", |el| {
                    update_base(el, &base);
                    rewrite_attribute(el, "href", ctx, ctx.base())
                }),
                element!("a[href], link[href], area[href]", |el| {
                    rewrite_attribute(el, "href", ctx, &base.borrow())
                }),
                element!("form[action]", |el| {
                    rewrite_attribute(el, "action", ctx, &base.borrow())
                }),
                element!("[src]", |el| rewrite_attribute(el, "src", ctx, &base.borrow())),
                element!("[srcset]", |el| {
                    if let Some(value) = el.get_attribute("srcset") {
                        if let Some(next) = rewrite_srcset(&value, ctx, &base.borrow()) {
                            el.set_attribute("srcset", &next)?;
                        }
                    }
                    Ok(())
                }),
                text!("style", |chunk| apply_inline(chunk, &plan.styles, &style_index)),
                text!("script", |chunk| apply_inline(chunk, &plan.scripts, &script_index)),
            ],
            encoding,
            adjust_charset_on_meta_tag: true,
            strict: false,
            ..Settings::new()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter.write(input)?;
    rewriter.end()?;

    if injected.get() {
        Ok(output)
    } else {
        inject_without_head(output, &shim_tag, encoding)
    }
}

/// The declared charset when lol_html can stream it, else UTF-8.
fn document_encoding(ctx: &RewriteContext) -> AsciiCompatibleEncoding {
    declared_encoding(ctx)
        .and_then(AsciiCompatibleEncoding::new)
        .unwrap_or_else(AsciiCompatibleEncoding::utf_8)
}

fn declared_encoding(ctx: &RewriteContext) -> Option<&'static Encoding> {
    ctx.charset()
        .and_then(|label| Encoding::for_label(label.as_bytes()))
}

/// Read-only pass: run the CSS and JS passes over every inline text node.
fn plan_inline(
    input: &[u8],
    ctx: &RewriteContext,
    encoding: AsciiCompatibleEncoding,
) -> Result<InlinePlan, RewriteError> {
    let base = RefCell::new(ctx.base().clone());
    let plan = RefCell::new(InlinePlan::default());
    let style_text = RefCell::new(String::new());
    let script_text = RefCell::new(String::new());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("base[href]", |el| {
                    update_base(el, &base);
                    Ok(())
                }),
                text!("style", |chunk| {
                    if let Some(next) = collect_inline(chunk, &style_text, |text| {
                        with_root_prefix(ctx, &base.borrow(), text, css::rewrite_with_prefix)
                    }) {
                        plan.borrow_mut().styles.push(next);
                    }
                    Ok(())
                }),
                text!("script", |chunk| {
                    if let Some(next) = collect_inline(chunk, &script_text, |text| {
                        with_root_prefix(ctx, &base.borrow(), text, js::rewrite_with_prefix)
                    }) {
                        plan.borrow_mut().scripts.push(next);
                    }
                    Ok(())
                }),
            ],
            encoding,
            adjust_charset_on_meta_tag: true,
            strict: false,
            ..Settings::new()
        },
        |_: &[u8]| {},
    );

    rewriter.write(input)?;
    rewriter.end()?;
    Ok(plan.into_inner())
}

fn update_base(el: &Element, base: &RefCell<Url>) {
    if let Some(href) = el.get_attribute("href") {
        let resolved = base.borrow().join(href.trim()).ok();
        if let Some(resolved) = resolved {
            *base.borrow_mut() = resolved;
        }
    }
}

fn rewrite_attribute(el: &mut Element, name: &str, ctx: &RewriteContext, base: &Url) -> HandlerResult {
    if let Some(value) = el.get_attribute(name) {
        if let Some(next) = ctx.rewrite_against(&value, base) {
            el.set_attribute(name, &next)?;
        }
    }
    Ok(())
}

/// Rewrite the URL part of each `srcset` candidate, keeping descriptors.
///
/// Returns `None` when nothing changed, or when the value holds a data URL
/// (its commas make candidate splitting ambiguous).
fn rewrite_srcset(value: &str, ctx: &RewriteContext, base: &Url) -> Option<String> {
    if value.to_ascii_lowercase().contains("data:") {
        return None;
    }

    let mut changed = false;
    let candidates: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .map(|candidate| {
            let (url, descriptor) = match candidate.split_once(char::is_whitespace) {
                Some((url, descriptor)) => (url, descriptor.trim()),
                None => (candidate, ""),
            };
            let url = match ctx.rewrite_against(url, base) {
                Some(next) => {
                    changed = true;
                    next
                }
                None => url.to_string(),
            };
            if descriptor.is_empty() {
                url
            } else {
                format!("{url} {descriptor}")
            }
        })
        .collect();

    changed.then(|| candidates.join(", "))
}

/// Buffer a text node's chunks. On its last chunk, return the node's plan
/// entry: `Some(Some(text))` when the pass changed it, `Some(None)` when not.
fn collect_inline<F>(chunk: &TextChunk, buffer: &RefCell<String>, rewrite: F) -> Option<Option<String>>
where
    F: FnOnce(&str) -> String,
{
    let mut text = buffer.borrow_mut();
    text.push_str(chunk.as_str());
    if !chunk.last_in_text_node() {
        return None;
    }
    let rewritten = rewrite(&text);
    let entry = (rewritten != *text).then_some(rewritten);
    text.clear();
    Some(entry)
}

/// Re-emit a planned text node; nodes without a replacement pass through as received.
fn apply_inline(chunk: &mut TextChunk, plan: &[Option<String>], index: &Cell<usize>) -> HandlerResult {
    let last = chunk.last_in_text_node();
    if let Some(Some(rewritten)) = plan.get(index.get()) {
        if last {
            chunk.replace(rewritten, ContentType::Html);
        } else {
            chunk.remove();
        }
    }
    if last {
        index.set(index.get() + 1);
    }
    Ok(())
}

fn with_root_prefix(
    ctx: &RewriteContext,
    base: &Url,
    text: &str,
    pass: fn(&[u8], &[u8]) -> Vec<u8>,
) -> String {
    match ctx.origin().prefix_for(base) {
        Some(prefix) => String::from_utf8_lossy(&pass(text.as_bytes(), prefix.as_bytes())).into_owned(),
        None => text.to_string(),
    }
}

/// Place the shim when the document has no `<head>`: first child of
/// `<html>`, else right after the doctype, else at the very start.
fn inject_without_head(
    document: Vec<u8>,
    shim_tag: &str,
    encoding: AsciiCompatibleEncoding,
) -> Result<Vec<u8>, RewriteError> {
    let injected = Cell::new(false);
    let mut output = Vec::with_capacity(document.len() + shim_tag.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("html", |el| {
                if !injected.replace(true) {
                    el.prepend(shim_tag, ContentType::Html);
                }
                Ok(())
            })],
            encoding,
            strict: false,
            ..Settings::new()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );
    rewriter.write(&document)?;
    rewriter.end()?;

    if injected.get() {
        return Ok(output);
    }

    let at = doctype_end(&document).unwrap_or(0);
    let mut out = Vec::with_capacity(document.len() + shim_tag.len());
    out.extend_from_slice(&document[..at]);
    out.extend_from_slice(shim_tag.as_bytes());
    out.extend_from_slice(&document[at..]);
    Ok(out)
}

fn doctype_end(document: &[u8]) -> Option<usize> {
    let start = document.iter().position(|b| !b.is_ascii_whitespace())?;
    let head = document.get(start..start + 9)?;
    if !head.eq_ignore_ascii_case(b"<!doctype") {
        return None;
    }
    document[start..]
        .iter()
        .position(|&b| b == b'>')
        .map(|pos| start + pos + 1)
}
