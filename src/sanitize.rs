//! Conversion of untrusted payload strings into browser-safe text or HTML.
//!
//! Metadata fields (username, timestamps, level) go through [`SanitizeMode::Text`],
//! which escapes all markup. Free-text fields go through [`SanitizeMode::Html`],
//! which keeps a small allow-list of formatting tags and hardens links.

use std::collections::{HashMap, HashSet};

/// Tags that survive HTML sanitization.
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "i", "u", "strong", "em", "br", "p", "ul", "ol", "li", "code", "pre",
];

/// Link schemes allowed in `href`. Everything else (including `javascript:`) is dropped.
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// How a field is cleaned before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Escape everything; the field must never carry markup.
    Text,
    /// Allow-listed HTML with hardened anchors.
    Html,
}

/// Sanitize `input` according to `mode`. Total over any input, never fails.
pub fn sanitize(input: &str, mode: SanitizeMode) -> String {
    match mode {
        SanitizeMode::Text => escape_text(input),
        SanitizeMode::Html => sanitize_html(input),
    }
}

/// Escape `&`, `<` and `>` so the string renders as a text node.
pub fn escape_text(input: &str) -> String {
    html_escape::encode_text(input).into_owned()
}

/// Run `input` through the allow-list policy.
///
/// Anchors always get `target="_blank"` and `rel="noopener noreferrer"`.
/// Event handlers, `style`, `data-*` and every other attribute are removed.
pub fn sanitize_html(input: &str) -> String {
    let tags: HashSet<&str> = ALLOWED_TAGS.iter().copied().collect();
    let schemes: HashSet<&str> = ALLOWED_URL_SCHEMES.iter().copied().collect();
    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", HashSet::from(["href"]));

    let mut builder = ammonia::Builder::default();
    builder
        .tags(tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .url_schemes(schemes)
        .link_rel(Some("noopener noreferrer"))
        .set_tag_attribute_value("a", "target", "_blank");

    let cleaned = builder.clean(input).to_string();
    neutralize_residual(&cleaned)
}

/// Entity-encode script-like sequences that survived as plain text.
///
/// After cleaning they are inert, but encoding them keeps the literal
/// substrings out of the output entirely. Browsers display them unchanged.
fn neutralize_residual(html: &str) -> String {
    lazy_static::lazy_static! {
        static ref SCRIPT_SCHEME: regex::Regex =
            regex::Regex::new(r"(?i)(javascript|vbscript)(\s*):").unwrap();
        static ref EVENT_HANDLER: regex::Regex =
            regex::Regex::new(r"(?i)\b(on[a-z]+)(\s*)=").unwrap();
    }
    let html = SCRIPT_SCHEME.replace_all(html, "$1$2&#58;");
    EVENT_HANDLER.replace_all(&html, "$1$2&#61;").into_owned()
}
