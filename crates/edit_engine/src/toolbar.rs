//! Toolbar buttons for the annotation kinds

use crate::{EditorCommand, EditorSession, Result, TogglePayload};
use doc_model::{AnnotationKind, DocumentTree, Selection};

/// Button applying an annotation to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarItem {
    kind: AnnotationKind,
}

impl ToolbarItem {
    pub fn new(kind: AnnotationKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    pub fn key(&self) -> &'static str {
        self.kind.type_tag()
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// Position within the feature's button group
    pub fn order(&self) -> u32 {
        1
    }

    /// Whether the selection sits inside an annotation of this kind
    pub fn is_active(&self, tree: &DocumentTree, selection: Option<&Selection>) -> bool {
        selection
            .filter(|s| !s.is_collapsed())
            .is_some_and(|s| tree.matching_annotation(s.focus.node_id, self.kind).is_some())
    }

    /// Whether there is selected text to annotate
    pub fn is_enabled(&self, tree: &DocumentTree, selection: Option<&Selection>) -> bool {
        selection
            .filter(|s| !s.is_collapsed())
            .is_some_and(|s| !tree.selection_text(s).is_empty())
    }

    /// Button pressed: annotate the selection and open the field drawer.
    ///
    /// Selected nodes and text are captured now because the selection may
    /// move while the drawer is open. Returns false when nothing happened.
    pub fn on_select(&self, session: &mut EditorSession) -> Result<bool> {
        let tree = session.tree();
        let selection = session.selection();
        if self.is_active(tree, selection) {
            return Ok(false);
        }
        let Some(selection) = selection.copied() else {
            return Ok(false);
        };
        let text = tree.selection_text(&selection);
        if text.is_empty() {
            return Ok(false);
        }
        let selected_nodes = tree.selected_nodes(&selection);

        let payload = TogglePayload {
            fields: None,
            selected_nodes: Some(selected_nodes),
            text: Some(text),
        };
        session.dispatch(EditorCommand::ToggleAnnotationWithModal {
            kind: self.kind,
            payload,
        })?;
        Ok(true)
    }
}

/// Toolbar items of the annotation plugins installed on `session`, in order
pub fn toolbar_items(session: &EditorSession) -> Vec<ToolbarItem> {
    let mut items: Vec<ToolbarItem> = AnnotationKind::ALL
        .into_iter()
        .filter(|&kind| session.has_plugin(kind))
        .map(ToolbarItem::new)
        .collect();
    items.sort_by_key(|item| (item.order(), item.key()));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EditorConfig, EditorSettings};
    use doc_model::Position;

    #[test]
    fn test_item_metadata() {
        let item = ToolbarItem::new(AnnotationKind::LanguageTag);
        assert_eq!(item.key(), "langTag");
        assert_eq!(item.label(), "Language tag");
        assert_eq!(item.order(), 1);
    }

    #[test]
    fn test_enabled_needs_selected_text() {
        let (tree, _, text_id) = DocumentTree::with_text("abc");
        let item = ToolbarItem::new(AnnotationKind::Abbreviation);
        assert!(!item.is_enabled(&tree, None));
        assert!(!item.is_enabled(&tree, Some(&Selection::collapsed(Position::new(text_id, 1)))));
        assert!(item.is_enabled(&tree, Some(&Selection::within(text_id, 0, 2))));
        assert!(!item.is_active(&tree, Some(&Selection::within(text_id, 0, 2))));
    }

    #[test]
    fn test_on_select_annotates_and_opens_drawer() {
        let (tree, _, text_id) = DocumentTree::with_text("I love UTF-8");
        let mut session = EditorSession::with_default_plugins(EditorSettings::default(), tree).unwrap();
        session.set_selection(Some(Selection::within(text_id, 7, 12))).unwrap();

        let item = ToolbarItem::new(AnnotationKind::Abbreviation);
        assert!(item.on_select(&mut session).unwrap());

        let annotations = session.tree().annotations(AnnotationKind::Abbreviation);
        assert_eq!(annotations.len(), 1);
        assert_eq!(session.tree().text_content(annotations[0]), "UTF-8");
        assert_eq!(session.tree().annotation(annotations[0]).unwrap().value(), "");
        let slug = session.drawer_slug(AnnotationKind::Abbreviation);
        assert_eq!(session.drawers().data(&slug).unwrap().text, "UTF-8");

        // Inside the annotation now, so the button is active and does nothing
        assert!(item.is_active(session.tree(), session.selection()));
        assert!(!item.on_select(&mut session).unwrap());
    }

    #[test]
    fn test_items_follow_installed_plugins() {
        let mut settings = EditorSettings::default();
        settings.annotations.enabled = vec![AnnotationKind::LanguageTag];
        let mut session = EditorSession::new(EditorConfig::default(), settings);
        crate::AnnotationPlugin::register_enabled(&mut session, || Box::new(crate::NoLayout)).unwrap();

        let items = toolbar_items(&session);
        assert_eq!(items, vec![ToolbarItem::new(AnnotationKind::LanguageTag)]);
    }
}
