//! Conversion between markup elements and document nodes
//!
//! Annotation nodes are recognized on import through a conversion map keyed
//! by element tag, mirroring how the editor registers importers per tag.
//! Everything the map does not claim falls through to default handling:
//! block elements become paragraphs or headings, format elements set text
//! format bits and unknown inline elements are unwrapped.

use crate::element::{MarkupElement, MarkupNode};
use crate::error::Result;
use crate::parser::parse_fragment;
use doc_model::{
    AnnotationId, AnnotationKind, AnnotationNode, DocumentTree, ElementAttributes, HeadingTag,
    NodeId, NodeKind, TextFormat, TextNode,
};
use std::collections::HashMap;

/// Importer for one element tag
pub type ConversionFn = fn(&MarkupElement) -> Option<AnnotationNode>;

/// A registered importer and its priority. Higher priorities are tried first.
#[derive(Debug, Clone, Copy)]
pub struct DomConversion {
    pub priority: u8,
    pub convert: ConversionFn,
}

/// Importers keyed by lowercase element tag
#[derive(Debug, Clone)]
pub struct DomConversionMap {
    conversions: HashMap<String, Vec<DomConversion>>,
}

impl DomConversionMap {
    /// An empty map that claims no elements
    pub fn new() -> Self {
        Self {
            conversions: HashMap::new(),
        }
    }

    /// A map with the importers of the given annotation kinds
    pub fn with_annotations(kinds: &[AnnotationKind]) -> Self {
        let mut map = Self::new();
        for &kind in kinds {
            let convert: ConversionFn = match kind {
                AnnotationKind::Abbreviation => convert_abbreviation,
                AnnotationKind::LanguageTag => convert_language_tag,
            };
            map.register(kind.markup_tag(), DomConversion { priority: 1, convert });
        }
        map
    }

    pub fn register(&mut self, tag: &str, conversion: DomConversion) {
        let entries = self.conversions.entry(tag.to_ascii_lowercase()).or_default();
        entries.push(conversion);
        entries.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Run the importers registered for the element's tag until one produces a node
    pub fn convert(&self, element: &MarkupElement) -> Option<AnnotationNode> {
        self.conversions
            .get(&element.tag)?
            .iter()
            .find_map(|conversion| (conversion.convert)(element))
    }
}

impl Default for DomConversionMap {
    fn default() -> Self {
        Self::with_annotations(&AnnotationKind::ALL)
    }
}

fn convert_abbreviation(element: &MarkupElement) -> Option<AnnotationNode> {
    import_annotation(AnnotationKind::Abbreviation, element)
}

fn convert_language_tag(element: &MarkupElement) -> Option<AnnotationNode> {
    import_annotation(AnnotationKind::LanguageTag, element)
}

/// Build an annotation of `kind` from a matching markup element.
///
/// Returns `None` when the tag does not match, when the element has no text,
/// or, for language tags, when the `lang` attribute is missing or empty.
/// The node always gets a fresh id.
pub fn import_annotation(kind: AnnotationKind, element: &MarkupElement) -> Option<AnnotationNode> {
    if element.tag != kind.markup_tag() {
        return None;
    }
    let value = element.attribute(kind.field_name());
    if kind == AnnotationKind::LanguageTag && value.map_or(true, str::is_empty) {
        return None;
    }
    if element.text_content().is_empty() {
        return None;
    }
    let fields = kind.fields(value.unwrap_or_default());
    Some(AnnotationNode::new(fields, Some(AnnotationId::generate())))
}

/// The markup element for an annotation, without children
pub fn export_annotation(annotation: &AnnotationNode) -> MarkupElement {
    let kind = annotation.kind();
    MarkupElement::new(kind.markup_tag()).with_attribute(kind.field_name(), annotation.value())
}

const FORMAT_TAGS: [(&str, TextFormat); 7] = [
    ("strong", TextFormat::BOLD),
    ("em", TextFormat::ITALIC),
    ("s", TextFormat::STRIKETHROUGH),
    ("u", TextFormat::UNDERLINE),
    ("code", TextFormat::CODE),
    ("sub", TextFormat::SUBSCRIPT),
    ("sup", TextFormat::SUPERSCRIPT),
];

fn format_of_tag(tag: &str) -> Option<TextFormat> {
    let canonical = match tag {
        "b" => "strong",
        "i" => "em",
        "strike" | "del" => "s",
        other => other,
    };
    FORMAT_TAGS
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, format)| *format)
}

pub(crate) fn wrap_formats(format: TextFormat, inner: MarkupNode) -> MarkupNode {
    FORMAT_TAGS
        .iter()
        .rev()
        .filter(|(_, bit)| format.contains(*bit))
        .fold(inner, |node, (tag, _)| {
            let mut element = MarkupElement::new(*tag);
            element.append_child(node);
            MarkupNode::Element(element)
        })
}

/// Export the children of the root as markup nodes
pub fn export_tree(tree: &DocumentTree) -> Vec<MarkupNode> {
    tree.children(tree.root_id())
        .iter()
        .filter_map(|&id| export_node(tree, id))
        .collect()
}

/// Export one node and its subtree as a markup node
pub fn export_node(tree: &DocumentTree, id: NodeId) -> Option<MarkupNode> {
    let node = tree.get(id)?;
    let mut element = match &node.kind {
        NodeKind::Text(text) => {
            return Some(wrap_formats(text.format, MarkupNode::Text(text.text.clone())));
        }
        NodeKind::LineBreak => return Some(MarkupNode::Element(MarkupElement::new("br"))),
        NodeKind::Root(_) => MarkupElement::new("div"),
        NodeKind::Paragraph(_) => MarkupElement::new("p"),
        NodeKind::Heading { tag, .. } => MarkupElement::new(tag.as_str()),
        NodeKind::Annotation(annotation) => export_annotation(annotation),
    };
    for &child in node.children() {
        if let Some(child) = export_node(tree, child) {
            element.append_child(child);
        }
    }
    Some(MarkupNode::Element(element))
}

/// Serialize a whole document as an HTML fragment
pub fn export_html(tree: &DocumentTree) -> String {
    export_tree(tree).iter().map(MarkupNode::to_html).collect()
}

/// Parse an HTML fragment into a new document using the default conversion map
pub fn import_html(html: &str) -> Result<DocumentTree> {
    MarkupImporter::new(DomConversionMap::default()).import(html)
}

/// Builds document trees out of parsed markup
#[derive(Debug, Clone, Default)]
pub struct MarkupImporter {
    conversions: DomConversionMap,
}

impl MarkupImporter {
    pub fn new(conversions: DomConversionMap) -> Self {
        Self { conversions }
    }

    pub fn import(&self, html: &str) -> Result<DocumentTree> {
        let nodes = parse_fragment(html)?;
        let mut tree = DocumentTree::new();
        self.import_nodes(&mut tree, &nodes)?;
        let dropped = tree.prune_empty_annotations();
        if dropped > 0 {
            tracing::debug!("Dropped {} empty annotation(s) from imported markup", dropped);
        }
        Ok(tree)
    }

    /// Import top-level markup below the root of `tree`.
    ///
    /// Runs of inline content between blocks are gathered into paragraphs.
    pub fn import_nodes(&self, tree: &mut DocumentTree, nodes: &[MarkupNode]) -> Result<()> {
        let root = tree.root_id();
        let mut pending: Option<NodeId> = None;
        for node in nodes {
            if let Some(kind) = node.as_element().and_then(block_kind) {
                pending = None;
                let block = tree.append_new(root, kind)?;
                if let MarkupNode::Element(element) = node {
                    self.import_block_children(tree, block, element)?;
                }
                continue;
            }
            if let MarkupNode::Text(text) = node {
                if pending.is_none() && text.trim().is_empty() {
                    continue;
                }
            }
            let paragraph = match pending {
                Some(paragraph) => paragraph,
                None => {
                    let paragraph = tree.append_paragraph();
                    pending = Some(paragraph);
                    paragraph
                }
            };
            self.import_inline(tree, paragraph, node, TextFormat::PLAIN)?;
        }
        Ok(())
    }

    fn import_block_children(
        &self,
        tree: &mut DocumentTree,
        block: NodeId,
        element: &MarkupElement,
    ) -> Result<()> {
        for child in &element.children {
            match child.as_element().filter(|e| block_kind(e).is_some()) {
                // A block nested inside a block is flattened into its parent
                Some(nested) => self.import_block_children(tree, block, nested)?,
                None => self.import_inline(tree, block, child, TextFormat::PLAIN)?,
            }
        }
        Ok(())
    }

    fn import_inline(
        &self,
        tree: &mut DocumentTree,
        parent: NodeId,
        node: &MarkupNode,
        format: TextFormat,
    ) -> Result<()> {
        let element = match node {
            MarkupNode::Text(text) => {
                if !text.is_empty() {
                    tree.append_new(parent, NodeKind::Text(TextNode::with_format(text.clone(), format)))?;
                }
                return Ok(());
            }
            MarkupNode::Element(element) => element,
        };

        if element.tag == "br" {
            tree.append_new(parent, NodeKind::LineBreak)?;
            return Ok(());
        }
        if let Some(annotation) = self.conversions.convert(element) {
            let annotation_id = tree.append_annotation(parent, annotation)?;
            return self.import_inline_children(tree, annotation_id, element, format);
        }
        let format = match format_of_tag(&element.tag) {
            Some(bit) => format.with(bit),
            None => format,
        };
        self.import_inline_children(tree, parent, element, format)
    }

    fn import_inline_children(
        &self,
        tree: &mut DocumentTree,
        parent: NodeId,
        element: &MarkupElement,
        format: TextFormat,
    ) -> Result<()> {
        for child in &element.children {
            self.import_inline(tree, parent, child, format)?;
        }
        Ok(())
    }
}

fn block_kind(element: &MarkupElement) -> Option<NodeKind> {
    match element.tag.as_str() {
        "p" | "div" => Some(NodeKind::Paragraph(ElementAttributes::default())),
        tag => HeadingTag::from_tag(tag).map(|tag| NodeKind::Heading {
            tag,
            attrs: ElementAttributes::default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::NodeType;

    fn span(lang: Option<&str>, text: &str) -> MarkupElement {
        let mut element = MarkupElement::new("span");
        if let Some(lang) = lang {
            element.set_attribute("lang", lang);
        }
        if !text.is_empty() {
            element.append_text(text);
        }
        element
    }

    #[test]
    fn test_import_language_tag() {
        let node = import_annotation(AnnotationKind::LanguageTag, &span(Some("de"), "Block")).unwrap();
        assert_eq!(node.value(), "de");
        assert_eq!(node.kind(), AnnotationKind::LanguageTag);
        assert!(!node.id().is_empty());
    }

    #[test]
    fn test_import_requires_text_and_lang() {
        assert!(import_annotation(AnnotationKind::LanguageTag, &span(Some("de"), "")).is_none());
        assert!(import_annotation(AnnotationKind::LanguageTag, &span(None, "Block")).is_none());
        assert!(import_annotation(AnnotationKind::LanguageTag, &span(Some(""), "Block")).is_none());
        let empty_abbr = MarkupElement::new("abbr").with_attribute("title", "North Atlantic");
        assert!(import_annotation(AnnotationKind::Abbreviation, &empty_abbr).is_none());
    }

    #[test]
    fn test_import_abbreviation_without_title() {
        let element = MarkupElement::new("abbr").with_text("NATO");
        let node = import_annotation(AnnotationKind::Abbreviation, &element).unwrap();
        assert_eq!(node.value(), "");
    }

    #[test]
    fn test_import_rejects_other_tags() {
        let element = MarkupElement::new("b").with_attribute("title", "x").with_text("y");
        assert!(import_annotation(AnnotationKind::Abbreviation, &element).is_none());
        assert!(DomConversionMap::default().convert(&element).is_none());
    }

    #[test]
    fn test_export_annotation() {
        let fields = doc_model::AnnotationFields::abbreviation("World Health Organization");
        let node = AnnotationNode::new(fields, None);
        let element = export_annotation(&node);
        assert_eq!(element.tag, "abbr");
        assert_eq!(element.attribute("title"), Some("World Health Organization"));
    }

    #[test]
    fn test_import_html_document() {
        let tree = import_html(
            r#"<h2>Fehler</h2>
            <p>Das ist ein <span lang="de">Block</span> und <b><abbr title="Unicode">UTF</abbr></b>.<br>Ende</p>
            stray <i>text</i>"#,
        )
        .unwrap();
        assert!(tree.check_invariants().is_ok());

        let blocks = tree.children(tree.root_id()).to_vec();
        assert_eq!(blocks.len(), 3);
        assert_eq!(tree.node_type(blocks[0]), Some(NodeType::Heading));
        assert_eq!(tree.text_content(blocks[1]), "Das ist ein Block und UTF.\nEnde");
        assert_eq!(tree.text_content(blocks[2]).trim(), "stray text");

        let lang = tree.annotations(AnnotationKind::LanguageTag);
        assert_eq!(lang.len(), 1);
        assert_eq!(tree.annotation(lang[0]).unwrap().value(), "de");

        let abbr = tree.annotations(AnnotationKind::Abbreviation);
        assert_eq!(abbr.len(), 1);
        let abbr_text = tree.children(abbr[0])[0];
        let format = tree.get(abbr_text).unwrap().kind.as_text().unwrap().format;
        assert!(format.contains(TextFormat::BOLD));
    }

    #[test]
    fn test_unrecognized_span_is_unwrapped() {
        let tree = import_html(r#"<p><span class="x">plain</span> <span lang="">empty</span></p>"#).unwrap();
        assert!(tree.annotations(AnnotationKind::LanguageTag).is_empty());
        let para = tree.children(tree.root_id())[0];
        assert_eq!(tree.text_content(para), "plain empty");
    }

    #[test]
    fn test_export_html() {
        let tree = import_html(r#"<p>A <span lang="fr">bloc</span> <strong>fort</strong></p>"#).unwrap();
        assert_eq!(
            export_html(&tree),
            r#"<p>A <span lang="fr">bloc</span> <strong>fort</strong></p>"#
        );
    }
}
