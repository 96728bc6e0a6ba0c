//! Field schema of the annotation edit form

use doc_model::{AnnotationFields, AnnotationKind, DocumentTree, NodeId};
use serde::{Deserialize, Serialize};

/// Input type of a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
}

/// One field of the edit form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
}

impl FieldDefinition {
    fn required_text(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::Text,
            label: label.to_string(),
            required: true,
        }
    }
}

/// Form fields for editing an annotation of `kind`: the display text and
/// the annotation value
pub fn field_schema(kind: AnnotationKind) -> Vec<FieldDefinition> {
    let value_label = match kind {
        AnnotationKind::Abbreviation => "Title",
        AnnotationKind::LanguageTag => "Language code (BCP 47)",
    };
    vec![
        FieldDefinition::required_text("text", "Text to display"),
        FieldDefinition::required_text(kind.field_name(), value_label),
    ]
}

/// Values shown in and submitted from the field drawer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The annotation value (title or language code)
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub text: String,
}

impl DrawerData {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
            text: text.into(),
        }
    }

    /// Initial data for the annotation node `id`
    pub fn for_annotation(tree: &DocumentTree, id: NodeId) -> Option<Self> {
        let annotation = tree.annotation(id)?;
        Some(Self {
            id: Some(annotation.id().as_str().to_string()),
            value: annotation.value().to_string(),
            text: tree.text_content(id),
        })
    }

    pub fn fields(&self, kind: AnnotationKind) -> AnnotationFields {
        kind.fields(self.value.clone())
    }
}
