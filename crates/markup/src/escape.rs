//! HTML escaping

use quick_xml::escape::{escape, partial_escape, unescape_with};
use std::borrow::Cow;

/// Escape a value for use inside a double-quoted HTML attribute.
///
/// `&`, `<`, `>`, `"` and `'` become entities.
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    escape(value)
}

/// Escape text content. Quotes are left alone.
pub fn escape_text(value: &str) -> Cow<'_, str> {
    partial_escape(value)
}

fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{a0}"),
        "shy" => Some("\u{ad}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "laquo" => Some("\u{ab}"),
        "raquo" => Some("\u{bb}"),
        "copy" => Some("\u{a9}"),
        _ => None,
    }
}

/// Resolve character references and the common named HTML entities.
///
/// Unknown entities leave the input untouched.
pub fn unescape_html(raw: &str) -> Cow<'_, str> {
    match unescape_with(raw, html_entity) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Keeping raw markup text, cannot unescape: {}", e);
            Cow::Borrowed(raw)
        }
    }
}
