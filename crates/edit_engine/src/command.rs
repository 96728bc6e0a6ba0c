//! Command system for document editing

use crate::toggle::{remove_annotation, toggle_annotation, ToggleOutcome, TogglePayload, ToggleResult};
use doc_model::{AnnotationKind, DocumentTree, NodeId, Selection};

/// Result of applying a command
#[derive(Debug)]
pub struct CommandResult {
    /// The new document tree after the command
    pub tree: DocumentTree,
    /// The new selection after the command
    pub selection: Option<Selection>,
    /// The inverse command (for undo)
    pub inverse: Box<dyn Command>,
}

/// Trait for all editing commands
pub trait Command: std::fmt::Debug + Send + Sync {
    /// Apply this command to a document
    fn apply(&self, tree: &DocumentTree, selection: Option<&Selection>) -> crate::Result<CommandResult>;

    /// Try to merge this command with another (for batching)
    fn merge_with(&self, _other: &dyn Command) -> Option<Box<dyn Command>> {
        None
    }

    /// Get a display name for this command
    fn display_name(&self) -> &str;

    /// Clone this command into a box
    fn clone_box(&self) -> Box<dyn Command>;
}

/// Apply, update or remove an annotation on the current selection
#[derive(Debug, Clone)]
pub struct ToggleAnnotation {
    pub kind: AnnotationKind,
    /// `None` removes the annotation
    pub payload: Option<TogglePayload>,
}

impl ToggleAnnotation {
    pub fn apply_payload(kind: AnnotationKind, payload: TogglePayload) -> Self {
        Self {
            kind,
            payload: Some(payload),
        }
    }

    pub fn remove(kind: AnnotationKind) -> Self {
        Self { kind, payload: None }
    }

    /// Run the toggle on a copy of `tree`, returning the outcome alongside the
    /// command result
    pub fn run(
        &self,
        tree: &DocumentTree,
        selection: Option<&Selection>,
    ) -> crate::Result<(CommandResult, ToggleOutcome)> {
        run_on_copy(tree, selection, |copy| {
            toggle_annotation(copy, selection, self.kind, self.payload.as_ref())
        })
    }
}

impl Command for ToggleAnnotation {
    fn apply(&self, tree: &DocumentTree, selection: Option<&Selection>) -> crate::Result<CommandResult> {
        self.run(tree, selection).map(|(result, _)| result)
    }

    fn display_name(&self) -> &str {
        match (self.kind, self.payload.is_some()) {
            (AnnotationKind::Abbreviation, true) => "Set Abbreviation",
            (AnnotationKind::Abbreviation, false) => "Remove Abbreviation",
            (AnnotationKind::LanguageTag, true) => "Set Language Tag",
            (AnnotationKind::LanguageTag, false) => "Remove Language Tag",
        }
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Remove an annotation, preferring nodes captured earlier over a live
/// selection that has gone away
#[derive(Debug, Clone)]
pub struct RemoveAnnotation {
    pub kind: AnnotationKind,
    pub selected_nodes: Option<Vec<NodeId>>,
}

impl RemoveAnnotation {
    pub fn run(
        &self,
        tree: &DocumentTree,
        selection: Option<&Selection>,
    ) -> crate::Result<(CommandResult, ToggleOutcome)> {
        run_on_copy(tree, selection, |copy| {
            remove_annotation(copy, selection, self.kind, self.selected_nodes.as_deref())
        })
    }
}

impl Command for RemoveAnnotation {
    fn apply(&self, tree: &DocumentTree, selection: Option<&Selection>) -> crate::Result<CommandResult> {
        self.run(tree, selection).map(|(result, _)| result)
    }

    fn display_name(&self) -> &str {
        match self.kind {
            AnnotationKind::Abbreviation => "Remove Abbreviation",
            AnnotationKind::LanguageTag => "Remove Language Tag",
        }
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

fn run_on_copy(
    tree: &DocumentTree,
    selection: Option<&Selection>,
    edit: impl FnOnce(&mut DocumentTree) -> crate::Result<ToggleResult>,
) -> crate::Result<(CommandResult, ToggleOutcome)> {
    let mut new_tree = tree.clone();
    let result = edit(&mut new_tree)?;
    let inverse = Box::new(RestoreTree {
        tree: tree.clone(),
        selection: selection.copied(),
    });
    Ok((
        CommandResult {
            tree: new_tree,
            selection: result.selection,
            inverse,
        },
        result.outcome,
    ))
}

/// Put back a previously captured document state.
///
/// Used as the inverse of structural edits whose effect is easier to snapshot
/// than to reverse step by step.
#[derive(Debug, Clone)]
pub struct RestoreTree {
    pub tree: DocumentTree,
    pub selection: Option<Selection>,
}

impl Command for RestoreTree {
    fn apply(&self, tree: &DocumentTree, selection: Option<&Selection>) -> crate::Result<CommandResult> {
        let inverse = Box::new(RestoreTree {
            tree: tree.clone(),
            selection: selection.copied(),
        });
        Ok(CommandResult {
            tree: self.tree.clone(),
            selection: self.selection,
            inverse,
        })
    }

    fn display_name(&self) -> &str {
        "Restore Document"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::AnnotationFields;

    #[test]
    fn test_toggle_inverse_restores_tree() {
        let (tree, _, text_id) = DocumentTree::with_text("NATO");
        let selection = Selection::within(text_id, 0, 4);
        let cmd = ToggleAnnotation::apply_payload(
            AnnotationKind::Abbreviation,
            TogglePayload::new(AnnotationFields::abbreviation("North Atlantic Treaty Organization")),
        );

        let result = cmd.apply(&tree, Some(&selection)).unwrap();
        assert_eq!(result.tree.annotations(AnnotationKind::Abbreviation).len(), 1);
        // The original tree is left untouched
        assert!(tree.annotations(AnnotationKind::Abbreviation).is_empty());

        let undone = result.inverse.apply(&result.tree, result.selection.as_ref()).unwrap();
        assert_eq!(undone.tree.to_snapshot(), tree.to_snapshot());
        assert_eq!(undone.selection, Some(selection));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ToggleAnnotation::remove(AnnotationKind::LanguageTag).display_name(), "Remove Language Tag");
        let set = ToggleAnnotation::apply_payload(AnnotationKind::Abbreviation, TogglePayload::default());
        assert_eq!(set.display_name(), "Set Abbreviation");
        let remove = RemoveAnnotation {
            kind: AnnotationKind::Abbreviation,
            selected_nodes: None,
        };
        assert_eq!(remove.display_name(), "Remove Abbreviation");
    }

    #[test]
    fn test_remove_captured_nodes_and_undo() {
        let (mut tree, para_id, _) = DocumentTree::with_text("Das ist ein ");
        let annotation = tree
            .append_annotation(para_id, doc_model::AnnotationNode::new(AnnotationFields::language_tag("de"), None))
            .unwrap();
        let inner = tree.append_text(annotation, "Block").unwrap();
        let cmd = RemoveAnnotation {
            kind: AnnotationKind::LanguageTag,
            selected_nodes: Some(vec![inner]),
        };

        let (result, outcome) = cmd.run(&tree, None).unwrap();
        assert_eq!(outcome, ToggleOutcome::Removed(1));
        assert!(result.tree.annotations(AnnotationKind::LanguageTag).is_empty());

        let undone = result.inverse.apply(&result.tree, None).unwrap();
        assert_eq!(undone.tree.to_snapshot(), tree.to_snapshot());
    }
}
