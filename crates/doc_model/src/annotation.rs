//! Annotation node - wraps inline content with one semantic field

use crate::{AnnotationId, ElementAttributes};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// The two single-field inline annotations supported by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// `<abbr title="...">`
    Abbreviation,
    /// `<span lang="...">`
    LanguageTag,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 2] = [AnnotationKind::Abbreviation, AnnotationKind::LanguageTag];

    /// Type tag used in snapshots and converter registries
    pub fn type_tag(&self) -> &'static str {
        match self {
            AnnotationKind::Abbreviation => "abbr",
            AnnotationKind::LanguageTag => "langTag",
        }
    }

    /// Markup element the annotation imports from and exports to
    pub fn markup_tag(&self) -> &'static str {
        match self {
            AnnotationKind::Abbreviation => "abbr",
            AnnotationKind::LanguageTag => "span",
        }
    }

    /// Name of the field, which doubles as the markup attribute name
    pub fn field_name(&self) -> &'static str {
        match self {
            AnnotationKind::Abbreviation => "title",
            AnnotationKind::LanguageTag => "lang",
        }
    }

    /// Human readable name, used for drawer titles and toolbar labels
    pub fn label(&self) -> &'static str {
        match self {
            AnnotationKind::Abbreviation => "Abbreviation",
            AnnotationKind::LanguageTag => "Language tag",
        }
    }

    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_tag() == tag)
    }

    /// Build fields of this kind carrying `value`
    pub fn fields(&self, value: impl Into<String>) -> AnnotationFields {
        match self {
            AnnotationKind::Abbreviation => AnnotationFields::Abbreviation { title: value.into() },
            AnnotationKind::LanguageTag => AnnotationFields::LanguageTag { lang: value.into() },
        }
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// Field record of an annotation. The shape is fixed per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationFields {
    Abbreviation { title: String },
    LanguageTag { lang: String },
}

impl AnnotationFields {
    pub fn abbreviation(title: impl Into<String>) -> Self {
        AnnotationFields::Abbreviation { title: title.into() }
    }

    pub fn language_tag(lang: impl Into<String>) -> Self {
        AnnotationFields::LanguageTag { lang: lang.into() }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationFields::Abbreviation { .. } => AnnotationKind::Abbreviation,
            AnnotationFields::LanguageTag { .. } => AnnotationKind::LanguageTag,
        }
    }

    /// The single field value (title or language code)
    pub fn value(&self) -> &str {
        match self {
            AnnotationFields::Abbreviation { title } => title,
            AnnotationFields::LanguageTag { lang } => lang,
        }
    }

    /// Read the fields of `kind` out of a JSON object.
    ///
    /// A missing or non-string value becomes the empty string.
    pub fn from_json(kind: AnnotationKind, value: &serde_json::Value) -> Self {
        let field = value
            .get(kind.field_name())
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        kind.fields(field)
    }

    /// Validate the field value against the form schema
    pub fn validate(&self) -> Result<(), FieldValidationError> {
        match self {
            AnnotationFields::Abbreviation { title } => {
                if title.trim().is_empty() {
                    return Err(FieldValidationError::EmptyValue);
                }
                Ok(())
            }
            AnnotationFields::LanguageTag { lang } => {
                if lang.is_empty() {
                    return Err(FieldValidationError::EmptyValue);
                }
                if !language_tag_pattern().is_match(lang) {
                    return Err(FieldValidationError::InvalidLanguageTag(lang.clone()));
                }
                Ok(())
            }
        }
    }
}

fn language_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,8}(-[A-Za-z0-9]{1,8})*$").expect("language tag pattern is valid")
    })
}

/// Errors that can occur during annotation field validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValidationError {
    EmptyValue,
    /// The annotation would hold no text
    EmptyText,
    InvalidLanguageTag(String),
}

impl std::fmt::Display for FieldValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValidationError::EmptyValue => write!(f, "Value cannot be empty"),
            FieldValidationError::EmptyText => write!(f, "Text to display cannot be empty"),
            FieldValidationError::InvalidLanguageTag(tag) => {
                write!(f, "Not a BCP 47 language tag: {}", tag)
            }
        }
    }
}

impl std::error::Error for FieldValidationError {}

/// An inline element wrapping a run of content with one extra semantic field.
///
/// Never empty, always inline, and text typed at its edges lands in sibling
/// nodes rather than inside it. See [`crate::NodeKind`] for the structural
/// queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationNode {
    id: AnnotationId,
    fields: AnnotationFields,
    /// Element format, indent and direction restored from snapshots
    pub attrs: ElementAttributes,
}

impl AnnotationNode {
    /// Create an annotation, generating an id when none is given
    pub fn new(fields: AnnotationFields, id: Option<AnnotationId>) -> Self {
        Self {
            id: id.unwrap_or_else(AnnotationId::generate),
            fields,
            attrs: ElementAttributes::default(),
        }
    }

    pub fn id(&self) -> &AnnotationId {
        &self.id
    }

    pub fn kind(&self) -> AnnotationKind {
        self.fields.kind()
    }

    pub fn fields(&self) -> &AnnotationFields {
        &self.fields
    }

    pub fn value(&self) -> &str {
        self.fields.value()
    }

    /// Replace the field record wholesale.
    ///
    /// Returns false and leaves the node untouched when the fields belong to
    /// another annotation kind.
    pub fn set_fields(&mut self, fields: AnnotationFields) -> bool {
        if fields.kind() != self.kind() {
            return false;
        }
        self.fields = fields;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_metadata() {
        assert_eq!(AnnotationKind::Abbreviation.type_tag(), "abbr");
        assert_eq!(AnnotationKind::LanguageTag.markup_tag(), "span");
        assert_eq!(AnnotationKind::LanguageTag.field_name(), "lang");
        assert_eq!(AnnotationKind::from_type_tag("langTag"), Some(AnnotationKind::LanguageTag));
        assert_eq!(AnnotationKind::from_type_tag("link"), None);
    }

    #[test]
    fn test_construct_generates_id() {
        let node = AnnotationNode::new(AnnotationFields::language_tag("de"), None);
        assert!(!node.id().is_empty());
        assert_eq!(node.value(), "de");

        let node = AnnotationNode::new(
            AnnotationFields::abbreviation("World Wide Web"),
            Some(AnnotationId::new("abc123")),
        );
        assert_eq!(node.id().as_str(), "abc123");
    }

    #[test]
    fn test_clone_is_independent() {
        let original = AnnotationNode::new(AnnotationFields::abbreviation("HTML"), None);
        let mut copy = original.clone();
        assert_eq!(copy.id(), original.id());
        assert!(copy.set_fields(AnnotationFields::abbreviation("XHTML")));
        assert_eq!(original.value(), "HTML");
        assert_eq!(copy.value(), "XHTML");
    }

    #[test]
    fn test_set_fields_rejects_other_kind() {
        let mut node = AnnotationNode::new(AnnotationFields::abbreviation("UN"), None);
        assert!(!node.set_fields(AnnotationFields::language_tag("fr")));
        assert_eq!(node.fields(), &AnnotationFields::abbreviation("UN"));
    }

    #[test]
    fn test_fields_from_json() {
        let value = serde_json::json!({ "lang": "pt-BR" });
        assert_eq!(
            AnnotationFields::from_json(AnnotationKind::LanguageTag, &value),
            AnnotationFields::language_tag("pt-BR")
        );

        let value = serde_json::json!({});
        assert_eq!(
            AnnotationFields::from_json(AnnotationKind::Abbreviation, &value),
            AnnotationFields::abbreviation("")
        );
    }

    #[test]
    fn test_fields_serialize_shape() {
        let json = serde_json::to_value(AnnotationFields::language_tag("ja")).unwrap();
        assert_eq!(json, serde_json::json!({ "lang": "ja" }));
    }

    #[test]
    fn test_field_validation() {
        assert!(AnnotationFields::language_tag("zh-Hant-TW").validate().is_ok());
        assert!(AnnotationFields::abbreviation("Internationalization").validate().is_ok());
        assert_eq!(
            AnnotationFields::language_tag("").validate(),
            Err(FieldValidationError::EmptyValue)
        );
        assert!(matches!(
            AnnotationFields::language_tag("not a tag").validate(),
            Err(FieldValidationError::InvalidLanguageTag(_))
        ));
        assert_eq!(
            AnnotationFields::abbreviation("   ").validate(),
            Err(FieldValidationError::EmptyValue)
        );
    }
}
