//! Lightweight markup element tree

use crate::escape::{escape_attribute, escape_text};

/// Elements that never have children or a closing tag
pub const VOID_ELEMENTS: [&str; 8] = ["area", "br", "col", "hr", "img", "input", "meta", "wbr"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// A node of parsed or exported markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
}

impl MarkupNode {
    pub fn text_content(&self) -> String {
        match self {
            MarkupNode::Element(element) => element.text_content(),
            MarkupNode::Text(text) => text.clone(),
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            MarkupNode::Element(element) => element.to_html(),
            MarkupNode::Text(text) => escape_text(text).into_owned(),
        }
    }

    pub fn as_element(&self) -> Option<&MarkupElement> {
        match self {
            MarkupNode::Element(element) => Some(element),
            MarkupNode::Text(_) => None,
        }
    }
}

/// An element with a lowercase tag name, ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.append_text(text);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn append_child(&mut self, child: MarkupNode) {
        self.children.push(child);
    }

    /// Append text, merging with a trailing text child
    pub fn append_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if let Some(MarkupNode::Text(last)) = self.children.last_mut() {
            last.push_str(&text);
        } else {
            self.children.push(MarkupNode::Text(text));
        }
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self) -> String {
        self.children.iter().map(|c| c.text_content()).collect()
    }

    pub fn is_void(&self) -> bool {
        is_void_element(&self.tag)
    }

    /// Serialize to HTML with escaped attribute values and text
    pub fn to_html(&self) -> String {
        let mut out = format!("<{}", self.tag);
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }
        out.push('>');
        if self.is_void() {
            return out;
        }
        for child in &self.children {
            out.push_str(&child.to_html());
        }
        out.push_str(&format!("</{}>", self.tag));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_are_case_insensitive() {
        let mut element = MarkupElement::new("SPAN").with_attribute("Lang", "de");
        assert_eq!(element.tag, "span");
        assert_eq!(element.attribute("lang"), Some("de"));
        element.set_attribute("LANG", "fr");
        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.attribute("lang"), Some("fr"));
    }

    #[test]
    fn test_text_content_and_merge() {
        let mut element = MarkupElement::new("p").with_text("Hello");
        element.append_text(", ");
        element.append_child(MarkupNode::Element(MarkupElement::new("b").with_text("world")));
        assert_eq!(element.children.len(), 2);
        assert_eq!(element.text_content(), "Hello, world");
    }

    #[test]
    fn test_to_html_escapes() {
        let element = MarkupElement::new("abbr")
            .with_attribute("title", "\"Quoted\" <tag>")
            .with_text("Q&A");
        assert_eq!(
            element.to_html(),
            "<abbr title=\"&quot;Quoted&quot; &lt;tag&gt;\">Q&amp;A</abbr>"
        );
        assert_eq!(MarkupElement::new("br").to_html(), "<br>");
    }
}
