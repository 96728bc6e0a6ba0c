//! Node kinds of the document tree

use crate::{AnnotationKind, AnnotationNode, NodeId};
use serde::{Deserialize, Serialize};

/// Block alignment stored on element nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementFormat {
    #[default]
    #[serde(rename = "")]
    None,
    Left,
    Start,
    Center,
    Right,
    End,
    Justify,
}

/// Text direction of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

/// Presentation attributes shared by every element node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAttributes {
    pub format: ElementFormat,
    pub indent: u32,
    pub direction: Option<Direction>,
}

/// Bit set of inline text formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextFormat(u32);

impl TextFormat {
    pub const PLAIN: TextFormat = TextFormat(0);
    pub const BOLD: TextFormat = TextFormat(1);
    pub const ITALIC: TextFormat = TextFormat(1 << 1);
    pub const STRIKETHROUGH: TextFormat = TextFormat(1 << 2);
    pub const UNDERLINE: TextFormat = TextFormat(1 << 3);
    pub const CODE: TextFormat = TextFormat(1 << 4);
    pub const SUBSCRIPT: TextFormat = TextFormat(1 << 5);
    pub const SUPERSCRIPT: TextFormat = TextFormat(1 << 6);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: TextFormat) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: TextFormat) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_plain(&self) -> bool {
        self.0 == 0
    }
}

/// A run of text with uniform inline formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    pub format: TextFormat,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::PLAIN,
        }
    }

    pub fn with_format(text: impl Into<String>, format: TextFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    /// Length in chars, the unit of selection offsets
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Heading level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingTag {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadingTag::H1 => "h1",
            HeadingTag::H2 => "h2",
            HeadingTag::H3 => "h3",
            HeadingTag::H4 => "h4",
            HeadingTag::H5 => "h5",
            HeadingTag::H6 => "h6",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "h1" => Some(HeadingTag::H1),
            "h2" => Some(HeadingTag::H2),
            "h3" => Some(HeadingTag::H3),
            "h4" => Some(HeadingTag::H4),
            "h5" => Some(HeadingTag::H5),
            "h6" => Some(HeadingTag::H6),
            _ => None,
        }
    }
}

/// Closed set of node types. Behavior dispatches on this tag instead of
/// through per-type subclasses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Root(ElementAttributes),
    Paragraph(ElementAttributes),
    Heading { tag: HeadingTag, attrs: ElementAttributes },
    Text(TextNode),
    LineBreak,
    Annotation(AnnotationNode),
}

/// Lightweight discriminant of [`NodeKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Root,
    Paragraph,
    Heading,
    Text,
    LineBreak,
    Annotation(AnnotationKind),
}

impl NodeType {
    /// Type tag used in snapshots and converter registries
    pub fn type_tag(&self) -> &'static str {
        match self {
            NodeType::Root => "root",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::Text => "text",
            NodeType::LineBreak => "linebreak",
            NodeType::Annotation(kind) => kind.type_tag(),
        }
    }
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Root(_) => NodeType::Root,
            NodeKind::Paragraph(_) => NodeType::Paragraph,
            NodeKind::Heading { .. } => NodeType::Heading,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::LineBreak => NodeType::LineBreak,
            NodeKind::Annotation(annotation) => NodeType::Annotation(annotation.kind()),
        }
    }

    /// Element nodes own children; text and line breaks are leaves
    pub fn is_element(&self) -> bool {
        matches!(
            self,
            NodeKind::Root(_) | NodeKind::Paragraph(_) | NodeKind::Heading { .. } | NodeKind::Annotation(_)
        )
    }

    /// Inline nodes take part in text flow, the rest are blocks
    pub fn is_inline(&self) -> bool {
        matches!(self, NodeKind::Text(_) | NodeKind::LineBreak | NodeKind::Annotation(_))
    }

    pub fn can_be_empty(&self) -> bool {
        !matches!(self, NodeKind::Annotation(_))
    }

    pub fn can_insert_text_before(&self) -> bool {
        !matches!(self, NodeKind::Annotation(_))
    }

    pub fn can_insert_text_after(&self) -> bool {
        !matches!(self, NodeKind::Annotation(_))
    }

    pub fn element_attributes(&self) -> Option<&ElementAttributes> {
        match self {
            NodeKind::Root(attrs) | NodeKind::Paragraph(attrs) => Some(attrs),
            NodeKind::Heading { attrs, .. } => Some(attrs),
            NodeKind::Annotation(annotation) => Some(&annotation.attrs),
            NodeKind::Text(_) | NodeKind::LineBreak => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationNode> {
        match self {
            NodeKind::Annotation(annotation) => Some(annotation),
            _ => None,
        }
    }

    pub fn as_annotation_mut(&mut self) -> Option<&mut AnnotationNode> {
        match self {
            NodeKind::Annotation(annotation) => Some(annotation),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True for an annotation node of `kind`
    pub fn is_annotation_of(&self, kind: AnnotationKind) -> bool {
        self.as_annotation().is_some_and(|a| a.kind() == kind)
    }
}

/// A node stored in the tree arena
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }
}
