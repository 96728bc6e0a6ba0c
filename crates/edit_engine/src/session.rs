//! Editor session - the document, its handlers and the command queue

use crate::bus::{self, route, CommandHandler, DrawerHost, EditorCommand, EditorContext};
use crate::{
    AnnotationPlugin, DrawerData, EditError, EditingEngine, EditorSettings, FloatingEditor, Result,
};
use doc_model::{AnnotationKind, DocumentTree, Selection};
use std::collections::VecDeque;
use uuid::Uuid;

/// Node types the host editor registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    annotation_nodes: Vec<AnnotationKind>,
}

impl EditorConfig {
    /// Configuration with no annotation node types
    pub fn empty() -> Self {
        Self {
            annotation_nodes: Vec::new(),
        }
    }

    pub fn with_annotations(kinds: impl IntoIterator<Item = AnnotationKind>) -> Self {
        let mut config = Self::empty();
        for kind in kinds {
            config.register_node(kind);
        }
        config
    }

    pub fn register_node(&mut self, kind: AnnotationKind) {
        if !self.annotation_nodes.contains(&kind) {
            self.annotation_nodes.push(kind);
        }
    }

    pub fn has_node(&self, kind: AnnotationKind) -> bool {
        self.annotation_nodes.contains(&kind)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::with_annotations(AnnotationKind::ALL)
    }
}

/// One editor instance.
///
/// Commands are queued and run one after another until the queue is empty.
/// Handlers see every command they asked for, highest priority first, until
/// one of them reports it handled the command. Whenever a command changed the
/// document, every handler is told afterwards.
pub struct EditorSession {
    config: EditorConfig,
    settings: EditorSettings,
    engine: EditingEngine,
    drawers: DrawerHost,
    handlers: Vec<Box<dyn CommandHandler>>,
    queue: VecDeque<EditorCommand>,
    editor_key: String,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("config", &self.config)
            .field("editor_key", &self.editor_key)
            .field("handlers", &self.handlers.len())
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Create a session over an empty document
    pub fn new(config: EditorConfig, settings: EditorSettings) -> Self {
        Self::with_tree(config, settings, DocumentTree::new())
    }

    pub fn with_tree(config: EditorConfig, settings: EditorSettings, tree: DocumentTree) -> Self {
        let engine = EditingEngine::with_tree(tree).with_undo_settings(&settings.undo);
        Self {
            config,
            settings,
            engine,
            drawers: DrawerHost::default(),
            handlers: Vec::new(),
            queue: VecDeque::new(),
            editor_key: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Create a session with a plugin for every annotation kind enabled in
    /// `settings`, without layout information
    pub fn with_default_plugins(settings: EditorSettings, tree: DocumentTree) -> Result<Self> {
        let mut session = Self::with_tree(EditorConfig::default(), settings, tree);
        AnnotationPlugin::register_enabled(&mut session, || Box::new(crate::NoLayout))?;
        Ok(session)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn editor_key(&self) -> &str {
        &self.editor_key
    }

    pub fn tree(&self) -> &DocumentTree {
        self.engine.tree()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.engine.selection()
    }

    pub fn engine(&self) -> &EditingEngine {
        &self.engine
    }

    pub fn drawers(&self) -> &DrawerHost {
        &self.drawers
    }

    pub fn add_handler(&mut self, handler: Box<dyn CommandHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn has_plugin(&self, kind: AnnotationKind) -> bool {
        self.handlers.iter().any(|handler| {
            handler
                .as_any()
                .downcast_ref::<AnnotationPlugin>()
                .is_some_and(|plugin| plugin.kind() == kind)
        })
    }

    pub fn floating_editor(&self, kind: AnnotationKind) -> Option<&FloatingEditor> {
        self.handlers
            .iter()
            .filter_map(|handler| handler.as_any().downcast_ref::<FloatingEditor>())
            .find(|editor| editor.kind() == kind)
    }

    /// Queue a command and run the queue to completion.
    ///
    /// On error the remaining queued commands are dropped.
    pub fn dispatch(&mut self, command: EditorCommand) -> Result<()> {
        self.queue.push_back(command);
        self.drain()
    }

    /// Move the live selection and let the handlers react
    pub fn set_selection(&mut self, selection: Option<Selection>) -> Result<()> {
        self.engine.set_selection(selection);
        self.dispatch(EditorCommand::SelectionChanged)
    }

    /// Slug of the field drawer of `kind` in this editor
    pub fn drawer_slug(&self, kind: AnnotationKind) -> String {
        bus::drawer_slug(kind, &self.editor_key)
    }

    pub fn open_drawer(&mut self, slug: impl Into<String>, data: DrawerData) {
        self.drawers.open_drawer(slug, data);
    }

    pub fn close_drawer(&mut self, slug: &str) -> bool {
        self.drawers.close_drawer(slug)
    }

    /// Floating editor "clear" button
    pub fn clear_annotation(&mut self, kind: AnnotationKind) -> Result<()> {
        self.with_floating_editor(kind, |editor, ctx| {
            editor.clear(ctx);
            Ok(())
        })
    }

    /// Floating editor "edit" button. Returns false when no annotation is shown.
    pub fn edit_annotation(&mut self, kind: AnnotationKind) -> Result<bool> {
        self.with_floating_editor(kind, |editor, ctx| Ok(editor.edit(ctx)))
    }

    /// Submit the field drawer of `kind`
    pub fn submit_fields(&mut self, kind: AnnotationKind, data: DrawerData) -> Result<()> {
        self.with_floating_editor(kind, |editor, ctx| editor.submit(ctx, data))
    }

    pub fn press_escape(&mut self) -> Result<()> {
        self.dispatch(EditorCommand::KeyEscape)
    }

    pub fn undo(&mut self) -> Result<()> {
        self.engine.undo()?;
        self.notify_update();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        self.engine.redo()?;
        self.notify_update();
        Ok(())
    }

    fn with_floating_editor<R>(
        &mut self,
        kind: AnnotationKind,
        action: impl FnOnce(&mut FloatingEditor, &mut EditorContext<'_>) -> Result<R>,
    ) -> Result<R> {
        let editor = self
            .handlers
            .iter_mut()
            .filter_map(|handler| handler.as_any_mut().downcast_mut::<FloatingEditor>())
            .find(|editor| editor.kind() == kind)
            .ok_or_else(|| EditError::InvalidCommand(format!("no floating editor for {kind}")))?;
        let mut ctx = EditorContext {
            engine: &mut self.engine,
            drawers: &mut self.drawers,
            settings: &self.settings,
            editor_key: &self.editor_key,
            queue: &mut self.queue,
        };
        let value = action(editor, &mut ctx)?;
        self.drain()?;
        Ok(value)
    }

    fn drain(&mut self) -> Result<()> {
        while let Some(command) = self.queue.pop_front() {
            let version = self.engine.tree().version();
            tracing::trace!("Dispatching {:?}", command);
            for index in route(&self.handlers, &command) {
                let mut ctx = EditorContext {
                    engine: &mut self.engine,
                    drawers: &mut self.drawers,
                    settings: &self.settings,
                    editor_key: &self.editor_key,
                    queue: &mut self.queue,
                };
                match self.handlers[index].handle(&command, &mut ctx) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => {
                        self.queue.clear();
                        return Err(e);
                    }
                }
            }
            if self.engine.tree().version() != version {
                self.notify_update();
            }
        }
        Ok(())
    }

    fn notify_update(&mut self) {
        for handler in &mut self.handlers {
            let mut ctx = EditorContext {
                engine: &mut self.engine,
                drawers: &mut self.drawers,
                settings: &self.settings,
                editor_key: &self.editor_key,
                queue: &mut self.queue,
            };
            handler.on_update(&mut ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FloatingEditorState, TogglePayload};
    use doc_model::AnnotationFields;

    fn session_with_text(text: &str) -> (EditorSession, doc_model::NodeId) {
        let (tree, _, text_id) = DocumentTree::with_text(text);
        let session = EditorSession::with_default_plugins(EditorSettings::default(), tree).unwrap();
        (session, text_id)
    }

    #[test]
    fn test_toggle_with_modal_opens_drawer() {
        let (mut session, text_id) = session_with_text("Das ist ein Block.");
        session.set_selection(Some(Selection::within(text_id, 12, 17))).unwrap();

        session
            .dispatch(EditorCommand::ToggleAnnotationWithModal {
                kind: AnnotationKind::LanguageTag,
                payload: TogglePayload::new(AnnotationFields::language_tag("")),
            })
            .unwrap();

        let slug = session.drawer_slug(AnnotationKind::LanguageTag);
        let data = session.drawers().data(&slug).unwrap();
        assert_eq!(data.text, "Block");
        assert_eq!(data.value, "");
        let editor = session.floating_editor(AnnotationKind::LanguageTag).unwrap();
        assert!(editor.state().is_visible());
    }

    #[test]
    fn test_escape_hides_visible_editor() {
        let (mut session, text_id) = session_with_text("UTF-8 rocks");
        session.set_selection(Some(Selection::within(text_id, 0, 5))).unwrap();
        session
            .dispatch(EditorCommand::ToggleAnnotation {
                kind: AnnotationKind::Abbreviation,
                payload: Some(TogglePayload::new(AnnotationFields::abbreviation("Unicode"))),
            })
            .unwrap();
        assert!(session.floating_editor(AnnotationKind::Abbreviation).unwrap().state().is_visible());

        let before = session.tree().to_snapshot();
        session.press_escape().unwrap();
        assert_eq!(
            session.floating_editor(AnnotationKind::Abbreviation).unwrap().state(),
            &FloatingEditorState::Hidden
        );
        assert_eq!(session.tree().to_snapshot(), before);
    }

    #[test]
    fn test_undo_refreshes_floating_editor() {
        let (mut session, text_id) = session_with_text("Hola mundo");
        session.set_selection(Some(Selection::within(text_id, 0, 4))).unwrap();
        session
            .dispatch(EditorCommand::ToggleAnnotation {
                kind: AnnotationKind::LanguageTag,
                payload: Some(TogglePayload::new(AnnotationFields::language_tag("es"))),
            })
            .unwrap();
        assert!(session.floating_editor(AnnotationKind::LanguageTag).unwrap().state().is_visible());

        session.undo().unwrap();
        assert!(session.tree().annotations(AnnotationKind::LanguageTag).is_empty());
        assert!(!session.floating_editor(AnnotationKind::LanguageTag).unwrap().state().is_visible());
    }

    #[test]
    fn test_actions_need_a_floating_editor() {
        let mut session = EditorSession::new(EditorConfig::default(), EditorSettings::default());
        let err = session.clear_annotation(AnnotationKind::Abbreviation).unwrap_err();
        assert!(matches!(err, EditError::InvalidCommand(_)));
    }

    #[test]
    fn test_config() {
        let mut config = EditorConfig::empty();
        assert!(!config.has_node(AnnotationKind::Abbreviation));
        config.register_node(AnnotationKind::Abbreviation);
        config.register_node(AnnotationKind::Abbreviation);
        assert!(config.has_node(AnnotationKind::Abbreviation));
        assert_eq!(config, EditorConfig::with_annotations([AnnotationKind::Abbreviation]));
        assert!(EditorConfig::default().has_node(AnnotationKind::LanguageTag));
    }
}
