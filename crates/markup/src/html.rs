//! Static HTML rendering of document snapshots
//!
//! Used by feeds and static export, where only the stored snapshot is
//! available. Each node type is rendered by a converter looked up by its type
//! tag; converters receive a callback that renders a list of children.

use crate::dom::wrap_formats;
use crate::element::MarkupNode;
use crate::escape::escape_attribute;
use doc_model::{AnnotationFields, SerializedEditorState, SerializedNode};
use std::collections::HashMap;

/// Renders an already resolved list of children
pub type ChildrenToHtml<'a> = dyn Fn(&[SerializedNode]) -> String + 'a;

/// Renders one node given a way to render its children
pub type HtmlConverterFn = fn(&SerializedNode, &ChildrenToHtml<'_>) -> String;

/// Wrap rendered children in the annotation's markup element.
///
/// An abbreviation without a title is rendered without the attribute.
pub fn annotation_to_html(fields: &AnnotationFields, children_html: &str) -> String {
    let kind = fields.kind();
    let tag = kind.markup_tag();
    if let AnnotationFields::Abbreviation { title } = fields {
        if title.is_empty() {
            return format!("<{tag}>{children_html}</{tag}>");
        }
    }
    format!(
        "<{tag} {attr}=\"{value}\">{children_html}</{tag}>",
        attr = kind.field_name(),
        value = escape_attribute(fields.value()),
    )
}

/// Converter registry keyed by node type tag
#[derive(Debug, Clone)]
pub struct HtmlConverters {
    converters: HashMap<String, HtmlConverterFn>,
}

impl HtmlConverters {
    /// A registry without any converter
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Register or replace the converter for `type_tag`
    pub fn register(&mut self, type_tag: impl Into<String>, converter: HtmlConverterFn) {
        self.converters.insert(type_tag.into(), converter);
    }

    pub fn get(&self, type_tag: &str) -> Option<HtmlConverterFn> {
        self.converters.get(type_tag).copied()
    }

    /// Render one node. Nodes without a converter render only their children.
    pub fn convert_node(&self, node: &SerializedNode) -> String {
        let render_children = |children: &[SerializedNode]| self.convert_nodes(children);
        match self.get(node.type_tag()) {
            Some(converter) => converter(node, &render_children),
            None => {
                tracing::warn!("No HTML converter for {} nodes, rendering children only", node.type_tag());
                render_children(node.children())
            }
        }
    }

    pub fn convert_nodes(&self, nodes: &[SerializedNode]) -> String {
        nodes.iter().map(|node| self.convert_node(node)).collect()
    }

    /// Render a whole document snapshot
    pub fn convert(&self, state: &SerializedEditorState) -> String {
        self.convert_node(&state.root)
    }
}

impl Default for HtmlConverters {
    fn default() -> Self {
        let mut converters = Self::empty();
        converters.register("root", convert_root);
        converters.register("paragraph", convert_paragraph);
        converters.register("heading", convert_heading);
        converters.register("text", convert_text);
        converters.register("linebreak", convert_line_break);
        for kind in doc_model::AnnotationKind::ALL {
            converters.register(kind.type_tag(), convert_annotation);
        }
        converters
    }
}

/// Render a snapshot with the default converters
pub fn convert_to_html(state: &SerializedEditorState) -> String {
    HtmlConverters::default().convert(state)
}

fn convert_root(node: &SerializedNode, children: &ChildrenToHtml<'_>) -> String {
    children(node.children())
}

fn convert_paragraph(node: &SerializedNode, children: &ChildrenToHtml<'_>) -> String {
    format!("<p>{}</p>", children(node.children()))
}

fn convert_heading(node: &SerializedNode, children: &ChildrenToHtml<'_>) -> String {
    let SerializedNode::Heading(heading) = node else {
        return children(node.children());
    };
    let tag = heading.tag.as_str();
    format!("<{tag}>{}</{tag}>", children(node.children()))
}

fn convert_text(node: &SerializedNode, _children: &ChildrenToHtml<'_>) -> String {
    match node {
        SerializedNode::Text(text) => {
            wrap_formats(text.format, MarkupNode::Text(text.text.clone())).to_html()
        }
        _ => String::new(),
    }
}

fn convert_line_break(_node: &SerializedNode, _children: &ChildrenToHtml<'_>) -> String {
    "<br>".to_string()
}

fn convert_annotation(node: &SerializedNode, children: &ChildrenToHtml<'_>) -> String {
    let children_html = children(node.children());
    match node.as_annotation() {
        Some((kind, annotation)) => annotation_to_html(&annotation.annotation_fields(kind), &children_html),
        None => children_html,
    }
}
