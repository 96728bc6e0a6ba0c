//! Typed editor commands and their handlers
//!
//! Commands are plain values; handlers register interest per command with a
//! priority. Dispatch goes through a FIFO queue that the session drains
//! synchronously, so a handler dispatching a follow-up command sees it run
//! after the current one completes.

use crate::{DrawerData, EditingEngine, EditorSettings, Result, TogglePayload};
use doc_model::{AnnotationKind, NodeId};
use std::any::Any;
use std::collections::{BTreeMap, VecDeque};

/// Commands understood by the editor
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    /// Apply, update or remove (`payload: None`) an annotation
    ToggleAnnotation {
        kind: AnnotationKind,
        payload: Option<TogglePayload>,
    },
    /// Remove an annotation, using `selected_nodes` when the live selection
    /// is gone or has moved away from them
    RemoveAnnotation {
        kind: AnnotationKind,
        selected_nodes: Option<Vec<NodeId>>,
    },
    /// Apply an annotation, then open its field drawer
    ToggleAnnotationWithModal {
        kind: AnnotationKind,
        payload: TogglePayload,
    },
    /// Open the field drawer of the annotation under the selection
    OpenFieldsDrawer { kind: AnnotationKind },
    /// The live selection changed
    SelectionChanged,
    /// The escape key was pressed
    KeyEscape,
}

/// Handlers with a higher priority see a command first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandPriority {
    Low,
    High,
}

/// Host drawers (modal forms), addressed by slug
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DrawerHost {
    open: BTreeMap<String, DrawerData>,
}

impl DrawerHost {
    pub fn open_drawer(&mut self, slug: impl Into<String>, data: DrawerData) {
        let slug = slug.into();
        tracing::debug!("Opening drawer {}", slug);
        self.open.insert(slug, data);
    }

    /// Close a drawer. Returns false when it was not open.
    pub fn close_drawer(&mut self, slug: &str) -> bool {
        self.open.remove(slug).is_some()
    }

    pub fn is_open(&self, slug: &str) -> bool {
        self.open.contains_key(slug)
    }

    /// Initial data the drawer was opened with
    pub fn data(&self, slug: &str) -> Option<&DrawerData> {
        self.open.get(slug)
    }

    pub fn open_slugs(&self) -> impl Iterator<Item = &str> {
        self.open.keys().map(String::as_str)
    }
}

/// Everything a handler may touch while handling a command
pub struct EditorContext<'a> {
    pub engine: &'a mut EditingEngine,
    pub drawers: &'a mut DrawerHost,
    pub settings: &'a EditorSettings,
    /// Suffix making drawer slugs unique per editor
    pub editor_key: &'a str,
    pub(crate) queue: &'a mut VecDeque<EditorCommand>,
}

impl EditorContext<'_> {
    /// Queue a command to run after the current one
    pub fn dispatch(&mut self, command: EditorCommand) {
        self.queue.push_back(command);
    }

    /// Slug of the field drawer of `kind` in this editor
    pub fn drawer_slug(&self, kind: AnnotationKind) -> String {
        drawer_slug(kind, self.editor_key)
    }
}

pub(crate) fn drawer_slug(kind: AnnotationKind, editor_key: &str) -> String {
    format!("rich-text-{}-{}", kind.type_tag(), editor_key)
}

/// A participant of the command bus
pub trait CommandHandler: Any {
    /// Priority at which this handler wants `command`, `None` to ignore it
    fn priority(&self, command: &EditorCommand) -> Option<CommandPriority>;

    /// Handle a command. Returning `true` stops propagation.
    fn handle(&mut self, command: &EditorCommand, ctx: &mut EditorContext<'_>) -> Result<bool>;

    /// Called after every command that changed the document
    fn on_update(&mut self, _ctx: &mut EditorContext<'_>) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Indices of the handlers interested in `command`, highest priority first.
/// Handlers of equal priority keep registration order.
pub(crate) fn route(handlers: &[Box<dyn CommandHandler>], command: &EditorCommand) -> Vec<usize> {
    let mut interested: Vec<(usize, CommandPriority)> = handlers
        .iter()
        .enumerate()
        .filter_map(|(index, handler)| handler.priority(command).map(|p| (index, p)))
        .collect();
    interested.sort_by(|a, b| b.1.cmp(&a.1));
    interested.into_iter().map(|(index, _)| index).collect()
}
