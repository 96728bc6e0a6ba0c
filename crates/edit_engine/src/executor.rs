//! Command execution engine

use crate::{
    Command, CommandResult, RemoveAnnotation, Result, ToggleAnnotation, ToggleOutcome, TogglePayload, UndoManager,
    UndoSettings,
};
use doc_model::{AnnotationKind, DocumentTree, NodeId, Selection};

/// Owns the document, the live selection and the undo history
#[derive(Debug)]
pub struct EditingEngine {
    tree: DocumentTree,
    /// `None` when there is no range selection
    selection: Option<Selection>,
    undo_manager: UndoManager,
}

impl EditingEngine {
    /// Create a new editing engine with an empty document
    pub fn new() -> Self {
        Self::with_tree(DocumentTree::new())
    }

    /// Create an editing engine with a specific document tree
    pub fn with_tree(tree: DocumentTree) -> Self {
        Self {
            tree,
            selection: None,
            undo_manager: UndoManager::new(),
        }
    }

    pub fn with_undo_settings(mut self, settings: &UndoSettings) -> Self {
        self.undo_manager = UndoManager::from_settings(settings);
        self
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Replace the live selection. Selections pointing at unknown nodes are dropped.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection
            .filter(|s| self.tree.contains(s.anchor.node_id) && self.tree.contains(s.focus.node_id));
    }

    /// Execute a command and record it for undo
    pub fn execute(&mut self, command: Box<dyn Command>) -> Result<()> {
        let result = command.apply(&self.tree, self.selection.as_ref())?;
        self.undo_manager.push(command, result.inverse);
        self.tree = result.tree;
        self.selection = result.selection;
        Ok(())
    }

    /// Toggle an annotation on the live selection.
    ///
    /// No-ops leave the document and the undo history untouched.
    pub fn toggle(&mut self, kind: AnnotationKind, payload: Option<TogglePayload>) -> Result<ToggleOutcome> {
        let command = ToggleAnnotation { kind, payload };
        let (result, outcome) = command.run(&self.tree, self.selection.as_ref())?;
        Ok(self.record(Box::new(command), result, outcome))
    }

    /// Remove an annotation of `kind`, falling back to `selected_nodes` when
    /// the live selection no longer points at them
    pub fn remove(&mut self, kind: AnnotationKind, selected_nodes: Option<Vec<NodeId>>) -> Result<ToggleOutcome> {
        let command = RemoveAnnotation { kind, selected_nodes };
        let (result, outcome) = command.run(&self.tree, self.selection.as_ref())?;
        Ok(self.record(Box::new(command), result, outcome))
    }

    fn record(&mut self, command: Box<dyn Command>, result: CommandResult, outcome: ToggleOutcome) -> ToggleOutcome {
        if outcome.is_noop() {
            return outcome;
        }
        self.undo_manager.push(command, result.inverse);
        self.tree = result.tree;
        self.selection = result.selection;
        outcome
    }

    /// Undo the last command
    pub fn undo(&mut self) -> Result<()> {
        let inverse = self.undo_manager.pop_undo()?;
        let result = inverse.apply(&self.tree, self.selection.as_ref())?;
        self.tree = result.tree;
        self.selection = result.selection;
        Ok(())
    }

    /// Redo the last undone command
    pub fn redo(&mut self) -> Result<()> {
        let command = self.undo_manager.pop_redo()?;
        let result = command.apply(&self.tree, self.selection.as_ref())?;
        self.undo_manager.push(command, result.inverse);
        self.tree = result.tree;
        self.selection = result.selection;
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.undo_manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_manager.can_redo()
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo_manager
    }
}

impl Default for EditingEngine {
    fn default() -> Self {
        Self::new()
    }
}
