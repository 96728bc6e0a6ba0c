//! Lenient HTML fragment parser
//!
//! Pasted and imported HTML is rarely well-formed XML. The parser accepts
//! unclosed void elements (`<br>`), mismatched and stray end tags, and
//! attributes without values. Open elements left at the end of input are
//! closed implicitly.

use crate::element::{is_void_element, MarkupElement, MarkupNode};
use crate::error::{MarkupError, Result};
use crate::escape::unescape_html;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const FRAGMENT_ROOT: &str = "#fragment";

/// Parse an HTML fragment into its top-level nodes
pub fn parse_fragment(html: &str) -> Result<Vec<MarkupNode>> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut stack = vec![MarkupElement::new(FRAGMENT_ROOT)];
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let element = read_element(&start);
                if element.is_void() {
                    push_child(&mut stack, MarkupNode::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Ok(Event::Empty(start)) => {
                let element = read_element(&start);
                push_child(&mut stack, MarkupNode::Element(element));
            }
            Ok(Event::End(end)) => {
                let tag = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                close_element(&mut stack, &tag);
            }
            Ok(Event::Text(text)) => {
                let raw = String::from_utf8_lossy(&text);
                append_text(&mut stack, &unescape_html(&raw));
            }
            Ok(Event::CData(data)) => {
                append_text(&mut stack, &String::from_utf8_lossy(&data));
            }
            Ok(Event::Eof) => break,
            // Comments, doctypes, declarations and processing instructions
            Ok(_) => {}
            Err(e) => {
                return Err(MarkupError::Parse(format!(
                    "at byte {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    Ok(stack.pop().map(|fragment| fragment.children).unwrap_or_default())
}

fn read_element(start: &BytesStart<'_>) -> MarkupElement {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut element = MarkupElement::new(tag);
    for attribute in start.html_attributes() {
        match attribute {
            Ok(attribute) => {
                let name = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
                let raw = String::from_utf8_lossy(&attribute.value);
                element.set_attribute(name, unescape_html(&raw));
            }
            Err(e) => {
                tracing::debug!("Skipping malformed attributes on <{}>: {}", element.tag, e);
                break;
            }
        }
    }
    element
}

fn push_child(stack: &mut [MarkupElement], child: MarkupNode) {
    if let Some(parent) = stack.last_mut() {
        parent.append_child(child);
    }
}

fn append_text(stack: &mut [MarkupElement], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.append_text(text);
    }
}

fn pop_into_parent(stack: &mut Vec<MarkupElement>) {
    if let Some(element) = stack.pop() {
        push_child(stack, MarkupNode::Element(element));
    }
}

/// Close the nearest open element named `tag`, closing everything opened
/// inside it. End tags without a matching open element are ignored.
fn close_element(stack: &mut Vec<MarkupElement>, tag: &str) {
    if is_void_element(tag) {
        return;
    }
    let Some(index) = stack.iter().skip(1).rposition(|e| e.tag == tag).map(|i| i + 1) else {
        tracing::trace!("Ignoring stray end tag </{}>", tag);
        return;
    };
    while stack.len() > index {
        pop_into_parent(stack);
    }
}
