//! JSON snapshots of the document tree
//!
//! Snapshots are the persisted form of a document and the input of the static
//! HTML converters. Every node serializes to an object tagged by `"type"`;
//! element nodes carry `children`, `format`, `indent` and `direction`.

use crate::{
    AnnotationFields, AnnotationId, AnnotationKind, AnnotationNode, Direction, DocModelError,
    DocumentTree, ElementAttributes, ElementFormat, HeadingTag, Node, NodeId, NodeKind, Result,
    TextFormat, TextNode,
};
use serde::{Deserialize, Serialize};

const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

fn default_mode() -> String {
    "normal".to_string()
}

/// Top-level snapshot of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedEditorState {
    pub root: SerializedNode,
}

/// Snapshot of one node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SerializedNode {
    #[serde(rename = "root")]
    Root(SerializedElement),
    #[serde(rename = "paragraph")]
    Paragraph(SerializedElement),
    #[serde(rename = "heading")]
    Heading(SerializedHeading),
    #[serde(rename = "text")]
    Text(SerializedText),
    #[serde(rename = "linebreak")]
    LineBreak(SerializedLeaf),
    #[serde(rename = "abbr")]
    Abbr(SerializedAnnotation),
    #[serde(rename = "langTag")]
    LangTag(SerializedAnnotation),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedElement {
    #[serde(default)]
    pub children: Vec<SerializedNode>,
    #[serde(default)]
    pub format: ElementFormat,
    #[serde(default)]
    pub indent: u32,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl Default for SerializedElement {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            format: ElementFormat::None,
            indent: 0,
            direction: None,
            version: SNAPSHOT_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedHeading {
    pub tag: HeadingTag,
    #[serde(flatten)]
    pub element: SerializedElement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedText {
    pub text: String,
    #[serde(default)]
    pub format: TextFormat,
    #[serde(default)]
    pub detail: u32,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub style: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLeaf {
    #[serde(default = "default_version")]
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedAnnotation {
    /// Omitted when the annotation id is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: serde_json::Value,
    #[serde(flatten)]
    pub element: SerializedElement,
}

impl SerializedNode {
    /// The `"type"` tag of this node
    pub fn type_tag(&self) -> &'static str {
        match self {
            SerializedNode::Root(_) => "root",
            SerializedNode::Paragraph(_) => "paragraph",
            SerializedNode::Heading(_) => "heading",
            SerializedNode::Text(_) => "text",
            SerializedNode::LineBreak(_) => "linebreak",
            SerializedNode::Abbr(_) => AnnotationKind::Abbreviation.type_tag(),
            SerializedNode::LangTag(_) => AnnotationKind::LanguageTag.type_tag(),
        }
    }

    /// Children of element nodes, empty for leaves
    pub fn children(&self) -> &[SerializedNode] {
        match self {
            SerializedNode::Root(e) | SerializedNode::Paragraph(e) => &e.children,
            SerializedNode::Heading(h) => &h.element.children,
            SerializedNode::Abbr(a) | SerializedNode::LangTag(a) => &a.element.children,
            SerializedNode::Text(_) | SerializedNode::LineBreak(_) => &[],
        }
    }

    /// Annotation kind and snapshot, if this is an annotation node
    pub fn as_annotation(&self) -> Option<(AnnotationKind, &SerializedAnnotation)> {
        match self {
            SerializedNode::Abbr(a) => Some((AnnotationKind::Abbreviation, a)),
            SerializedNode::LangTag(a) => Some((AnnotationKind::LanguageTag, a)),
            _ => None,
        }
    }

    /// Plain text of the subtree
    pub fn text_content(&self) -> String {
        match self {
            SerializedNode::Text(t) => t.text.clone(),
            SerializedNode::LineBreak(_) => "\n".to_string(),
            other => other.children().iter().map(|c| c.text_content()).collect(),
        }
    }
}

impl SerializedAnnotation {
    /// Fields of `kind` read out of the snapshot
    pub fn annotation_fields(&self, kind: AnnotationKind) -> AnnotationFields {
        AnnotationFields::from_json(kind, &self.fields)
    }
}

fn element_snapshot(attrs: &ElementAttributes, children: Vec<SerializedNode>) -> SerializedElement {
    SerializedElement {
        children,
        format: attrs.format,
        indent: attrs.indent,
        direction: attrs.direction,
        version: SNAPSHOT_VERSION,
    }
}

fn element_attrs(element: &SerializedElement) -> ElementAttributes {
    ElementAttributes {
        format: element.format,
        indent: element.indent,
        direction: element.direction,
    }
}

impl AnnotationNode {
    /// Snapshot of this annotation around already serialized children
    pub fn serialize(&self, children: Vec<SerializedNode>) -> SerializedNode {
        let mut fields = serde_json::Map::new();
        fields.insert(
            self.kind().field_name().to_string(),
            serde_json::Value::String(self.value().to_string()),
        );
        let snapshot = SerializedAnnotation {
            id: (!self.id().is_empty()).then(|| self.id().as_str().to_string()),
            fields: serde_json::Value::Object(fields),
            element: element_snapshot(&self.attrs, children),
        };
        match self.kind() {
            AnnotationKind::Abbreviation => SerializedNode::Abbr(snapshot),
            AnnotationKind::LanguageTag => SerializedNode::LangTag(snapshot),
        }
    }

    /// Rebuild an annotation from its snapshot, children excluded.
    ///
    /// A snapshot without id gets a freshly generated one.
    pub fn deserialize(kind: AnnotationKind, snapshot: &SerializedAnnotation) -> Self {
        let mut node = AnnotationNode::new(
            snapshot.annotation_fields(kind),
            snapshot.id.clone().map(AnnotationId::new),
        );
        node.attrs = element_attrs(&snapshot.element);
        node
    }
}

impl DocumentTree {
    /// Snapshot of the subtree rooted at `id`
    pub fn serialize_node(&self, id: NodeId) -> Result<SerializedNode> {
        let node = self.get(id).ok_or(DocModelError::NodeNotFound(id.as_uuid()))?;
        Ok(self.serialize_existing(node))
    }

    fn serialize_existing(&self, node: &Node) -> SerializedNode {
        let children: Vec<SerializedNode> = node
            .children()
            .iter()
            .filter_map(|&child| self.get(child))
            .map(|child| self.serialize_existing(child))
            .collect();
        match &node.kind {
            NodeKind::Root(attrs) => SerializedNode::Root(element_snapshot(attrs, children)),
            NodeKind::Paragraph(attrs) => SerializedNode::Paragraph(element_snapshot(attrs, children)),
            NodeKind::Heading { tag, attrs } => SerializedNode::Heading(SerializedHeading {
                tag: *tag,
                element: element_snapshot(attrs, children),
            }),
            NodeKind::Text(text) => SerializedNode::Text(SerializedText {
                text: text.text.clone(),
                format: text.format,
                detail: 0,
                mode: default_mode(),
                style: String::new(),
                version: SNAPSHOT_VERSION,
            }),
            NodeKind::LineBreak => SerializedNode::LineBreak(SerializedLeaf {
                version: SNAPSHOT_VERSION,
            }),
            NodeKind::Annotation(annotation) => annotation.serialize(children),
        }
    }

    /// Snapshot of the whole document
    pub fn to_snapshot(&self) -> SerializedEditorState {
        let root = self
            .get(self.root_id())
            .map(|node| self.serialize_existing(node))
            .unwrap_or_else(|| SerializedNode::Root(SerializedElement::default()));
        SerializedEditorState { root }
    }

    /// Rebuild a document from its snapshot.
    ///
    /// Node ids are fresh. Annotations stored without children are dropped.
    pub fn from_snapshot(state: &SerializedEditorState) -> Result<Self> {
        let SerializedNode::Root(root) = &state.root else {
            return Err(DocModelError::InvalidSnapshot(format!(
                "Expected a root node, found {}",
                state.root.type_tag()
            )));
        };
        let mut tree = DocumentTree::new();
        let root_id = tree.root_id();
        if let Some(NodeKind::Root(attrs)) = tree.kind_mut(root_id) {
            *attrs = element_attrs(root);
        }
        for child in &root.children {
            tree.deserialize_into(root_id, child)?;
        }
        let dropped = tree.prune_empty_annotations();
        if dropped > 0 {
            tracing::warn!("Dropped {} empty annotation(s) while loading a snapshot", dropped);
        }
        Ok(tree)
    }

    /// Rebuild `snapshot` as the last child of `parent`
    pub fn deserialize_into(&mut self, parent: NodeId, snapshot: &SerializedNode) -> Result<NodeId> {
        let kind = match snapshot {
            SerializedNode::Root(_) => {
                return Err(DocModelError::InvalidSnapshot(
                    "A root node can only appear at the top of a snapshot".into(),
                ))
            }
            SerializedNode::Paragraph(e) => NodeKind::Paragraph(element_attrs(e)),
            SerializedNode::Heading(h) => NodeKind::Heading {
                tag: h.tag,
                attrs: element_attrs(&h.element),
            },
            SerializedNode::Text(t) => NodeKind::Text(TextNode::with_format(t.text.clone(), t.format)),
            SerializedNode::LineBreak(_) => NodeKind::LineBreak,
            SerializedNode::Abbr(a) => {
                NodeKind::Annotation(AnnotationNode::deserialize(AnnotationKind::Abbreviation, a))
            }
            SerializedNode::LangTag(a) => {
                NodeKind::Annotation(AnnotationNode::deserialize(AnnotationKind::LanguageTag, a))
            }
        };
        let id = self.append_new(parent, kind)?;
        for child in snapshot.children() {
            self.deserialize_into(id, child)?;
        }
        Ok(id)
    }

    /// Serialize the document to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_snapshot())?)
    }

    /// Load a document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let state: SerializedEditorState = serde_json::from_str(json)?;
        Self::from_snapshot(&state)
    }
}
