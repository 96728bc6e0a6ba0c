//! Floating editor for the annotation under the selection
//!
//! The editor is shown while the selection sits inside exactly one
//! annotation of its kind. Its state is re-derived from the document after
//! every update and selection change; it never holds state the document
//! could contradict.

use crate::bus::{CommandHandler, CommandPriority, EditorCommand, EditorContext};
use crate::{DrawerData, EditError, Result, TogglePayload};
use doc_model::{
    AnnotationFields, AnnotationId, AnnotationKind, DocumentTree, FieldValidationError, NodeId, NodeType, Selection,
};
use std::any::Any;

/// Screen rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn offset_y(self, dy: f32) -> Self {
        Self { y: self.y + dy, ..self }
    }
}

/// Geometry of the rendered document, supplied by the host
pub trait LayoutProvider {
    /// Bounding box of the native selection range
    fn selection_rect(&self, selection: &Selection) -> Option<Rect>;

    /// Bounding box of a rendered node
    fn node_rect(&self, node: NodeId) -> Option<Rect>;
}

/// Layout for headless use: nothing is rendered
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl LayoutProvider for NoLayout {
    fn selection_rect(&self, _selection: &Selection) -> Option<Rect> {
        None
    }

    fn node_rect(&self, _node: NodeId) -> Option<Rect> {
        None
    }
}

/// The annotation the floating editor currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleAnnotation {
    pub node: NodeId,
    pub id: AnnotationId,
    pub fields: AnnotationFields,
    pub text: String,
    /// Selected nodes captured for the drawer round trip
    pub selected_nodes: Vec<NodeId>,
    /// Where to draw the editor, if the layout is known
    pub position: Option<Rect>,
}

impl VisibleAnnotation {
    pub fn drawer_data(&self) -> DrawerData {
        DrawerData {
            id: Some(self.id.as_str().to_string()),
            value: self.fields.value().to_string(),
            text: self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FloatingEditorState {
    #[default]
    Hidden,
    Visible(VisibleAnnotation),
}

impl FloatingEditorState {
    pub fn is_visible(&self) -> bool {
        matches!(self, FloatingEditorState::Visible(_))
    }

    pub fn visible(&self) -> Option<&VisibleAnnotation> {
        match self {
            FloatingEditorState::Visible(visible) => Some(visible),
            FloatingEditorState::Hidden => None,
        }
    }
}

/// Work out what the floating editor of `kind` should show.
///
/// Hidden unless the focus node lies inside an annotation of `kind` and
/// every selected node (line breaks aside) lies inside that same annotation.
pub fn derive_state(
    tree: &DocumentTree,
    selection: Option<&Selection>,
    kind: AnnotationKind,
    layout: &dyn LayoutProvider,
    vertical_offset: f32,
) -> FloatingEditorState {
    let Some(selection) = selection else {
        return FloatingEditorState::Hidden;
    };
    let focus_node = selection.focus.node_id;
    let Some(annotation) = tree.matching_annotation(focus_node, kind) else {
        return FloatingEditorState::Hidden;
    };

    let selected_nodes = tree.selected_nodes(selection);
    let straddles = selected_nodes
        .iter()
        .filter(|&&id| tree.node_type(id) != Some(NodeType::LineBreak))
        .any(|&id| tree.matching_annotation(id, kind) != Some(annotation));
    if straddles {
        return FloatingEditorState::Hidden;
    }
    let Some(node) = tree.annotation(annotation) else {
        return FloatingEditorState::Hidden;
    };

    let position = layout
        .selection_rect(selection)
        .or_else(|| layout.node_rect(focus_node))
        .map(|rect| rect.offset_y(vertical_offset));

    FloatingEditorState::Visible(VisibleAnnotation {
        node: annotation,
        id: node.id().clone(),
        fields: node.fields().clone(),
        text: tree.text_content(annotation),
        selected_nodes,
        position,
    })
}

/// Floating editor of one annotation kind
pub struct FloatingEditor {
    kind: AnnotationKind,
    state: FloatingEditorState,
    layout: Box<dyn LayoutProvider>,
}

impl std::fmt::Debug for FloatingEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatingEditor")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl FloatingEditor {
    pub fn new(kind: AnnotationKind, layout: Box<dyn LayoutProvider>) -> Self {
        Self {
            kind,
            state: FloatingEditorState::Hidden,
            layout,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    pub fn state(&self) -> &FloatingEditorState {
        &self.state
    }

    /// Re-derive the state from the document and the live selection
    pub fn refresh(&mut self, ctx: &EditorContext<'_>) {
        self.state = derive_state(
            ctx.engine.tree(),
            ctx.engine.selection(),
            self.kind,
            self.layout.as_ref(),
            ctx.settings.floating_editor.vertical_offset,
        );
    }

    pub fn hide(&mut self) {
        self.state = FloatingEditorState::Hidden;
    }

    /// Remove the shown annotation
    pub fn clear(&mut self, ctx: &mut EditorContext<'_>) {
        ctx.dispatch(EditorCommand::RemoveAnnotation {
            kind: self.kind,
            selected_nodes: self.captured_nodes(),
        });
    }

    fn captured_nodes(&self) -> Option<Vec<NodeId>> {
        self.state.visible().map(|visible| visible.selected_nodes.clone())
    }

    /// Open the field drawer with the shown annotation's data.
    /// Returns false when nothing is shown.
    pub fn edit(&mut self, ctx: &mut EditorContext<'_>) -> bool {
        let Some(visible) = self.state.visible() else {
            return false;
        };
        let slug = ctx.drawer_slug(self.kind);
        ctx.drawers.open_drawer(slug, visible.drawer_data());
        true
    }

    /// Apply the values submitted from the field drawer.
    ///
    /// An empty value removes the annotation. Otherwise the display text must
    /// not be empty and the value must pass field validation; on failure the
    /// drawer stays open and nothing changes.
    pub fn submit(&mut self, ctx: &mut EditorContext<'_>, data: DrawerData) -> Result<()> {
        let slug = ctx.drawer_slug(self.kind);
        if data.value.is_empty() {
            ctx.dispatch(EditorCommand::RemoveAnnotation {
                kind: self.kind,
                selected_nodes: self.captured_nodes(),
            });
            ctx.drawers.close_drawer(&slug);
            self.hide();
            return Ok(());
        }

        if data.text.is_empty() {
            return Err(EditError::InvalidField(FieldValidationError::EmptyText));
        }
        let fields = data.fields(self.kind);
        fields.validate().map_err(EditError::InvalidField)?;

        let mut payload = TogglePayload::new(fields).with_text(data.text);
        if let Some(nodes) = self.captured_nodes() {
            payload = payload.with_selected_nodes(nodes);
        }
        ctx.dispatch(EditorCommand::ToggleAnnotation {
            kind: self.kind,
            payload: Some(payload),
        });
        ctx.drawers.close_drawer(&slug);
        Ok(())
    }
}

impl CommandHandler for FloatingEditor {
    fn priority(&self, command: &EditorCommand) -> Option<CommandPriority> {
        match command {
            EditorCommand::KeyEscape => Some(CommandPriority::High),
            EditorCommand::SelectionChanged => Some(CommandPriority::Low),
            EditorCommand::ToggleAnnotationWithModal { kind, .. }
            | EditorCommand::OpenFieldsDrawer { kind } => (*kind == self.kind).then_some(CommandPriority::Low),
            EditorCommand::ToggleAnnotation { .. } | EditorCommand::RemoveAnnotation { .. } => None,
        }
    }

    fn handle(&mut self, command: &EditorCommand, ctx: &mut EditorContext<'_>) -> Result<bool> {
        match command {
            EditorCommand::KeyEscape => {
                if self.state.is_visible() {
                    self.hide();
                    return Ok(true);
                }
                Ok(false)
            }
            EditorCommand::SelectionChanged => {
                // While the drawer is open it works on the nodes captured
                // when it opened, whatever the selection does meanwhile
                if !ctx.drawers.is_open(&ctx.drawer_slug(self.kind)) {
                    self.refresh(ctx);
                }
                // Every floating editor needs to see selection changes
                Ok(false)
            }
            EditorCommand::ToggleAnnotationWithModal { kind, payload } => {
                ctx.dispatch(EditorCommand::ToggleAnnotation {
                    kind: *kind,
                    payload: Some(payload.clone()),
                });
                ctx.dispatch(EditorCommand::OpenFieldsDrawer { kind: *kind });
                Ok(true)
            }
            EditorCommand::OpenFieldsDrawer { .. } => {
                self.refresh(ctx);
                if !self.edit(ctx) {
                    tracing::debug!("No {} annotation under the selection, drawer not opened", self.kind);
                }
                Ok(true)
            }
            EditorCommand::ToggleAnnotation { .. } | EditorCommand::RemoveAnnotation { .. } => Ok(false),
        }
    }

    fn on_update(&mut self, ctx: &mut EditorContext<'_>) {
        self.refresh(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
