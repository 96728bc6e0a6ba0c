//! Annotation editor plugins
//!
//! A plugin owns the plain toggle command of one annotation kind and installs
//! the floating editor for it.

use crate::bus::{CommandHandler, CommandPriority, EditorCommand, EditorContext};
use crate::{EditError, EditorSession, FloatingEditor, LayoutProvider, Result};
use doc_model::AnnotationKind;
use std::any::Any;

/// Applies `ToggleAnnotation` and `RemoveAnnotation` commands of one kind to
/// the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationPlugin {
    kind: AnnotationKind,
}

impl AnnotationPlugin {
    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    /// Install the plugin and floating editor of `kind` on a session.
    ///
    /// Fails when the session's configuration does not register the node
    /// type of `kind`.
    pub fn register(session: &mut EditorSession, kind: AnnotationKind, layout: Box<dyn LayoutProvider>) -> Result<()> {
        if !session.config().has_node(kind) {
            return Err(EditError::NodeTypeNotRegistered { kind });
        }
        if session.has_plugin(kind) {
            tracing::debug!("{} plugin already registered", kind);
            return Ok(());
        }
        session.add_handler(Box::new(AnnotationPlugin { kind }));
        session.add_handler(Box::new(FloatingEditor::new(kind, layout)));
        tracing::debug!("Registered {} plugin", kind);
        Ok(())
    }

    /// Register a plugin for every kind switched on in the session settings.
    /// Returns the number of plugins installed.
    pub fn register_enabled(
        session: &mut EditorSession,
        layout: impl Fn() -> Box<dyn LayoutProvider>,
    ) -> Result<usize> {
        let enabled: Vec<AnnotationKind> = AnnotationKind::ALL
            .into_iter()
            .filter(|&kind| session.settings().annotations.is_enabled(kind))
            .collect();
        for &kind in &enabled {
            Self::register(session, kind, layout())?;
        }
        Ok(enabled.len())
    }
}

impl CommandHandler for AnnotationPlugin {
    fn priority(&self, command: &EditorCommand) -> Option<CommandPriority> {
        match command {
            EditorCommand::ToggleAnnotation { kind, .. } | EditorCommand::RemoveAnnotation { kind, .. }
                if *kind == self.kind =>
            {
                Some(CommandPriority::Low)
            }
            _ => None,
        }
    }

    fn handle(&mut self, command: &EditorCommand, ctx: &mut EditorContext<'_>) -> Result<bool> {
        match command {
            EditorCommand::ToggleAnnotation { kind, payload } => {
                let outcome = ctx.engine.toggle(*kind, payload.clone())?;
                tracing::debug!("Toggled {}: {:?}", kind, outcome);
                Ok(true)
            }
            EditorCommand::RemoveAnnotation { kind, selected_nodes } => {
                let outcome = ctx.engine.remove(*kind, selected_nodes.clone())?;
                tracing::debug!("Removed {}: {:?}", kind, outcome);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EditorConfig, EditorSettings, NoLayout};

    #[test]
    fn test_register_requires_node_type() {
        let config = EditorConfig::with_annotations([AnnotationKind::Abbreviation]);
        let mut session = EditorSession::new(config, EditorSettings::default());

        let err = AnnotationPlugin::register(&mut session, AnnotationKind::LanguageTag, Box::new(NoLayout)).unwrap_err();
        assert!(matches!(err, EditError::NodeTypeNotRegistered { kind: AnnotationKind::LanguageTag }));
        assert_eq!(err.to_string(), "langTag node type is not registered on the editor");

        AnnotationPlugin::register(&mut session, AnnotationKind::Abbreviation, Box::new(NoLayout)).unwrap();
        assert!(session.has_plugin(AnnotationKind::Abbreviation));
        assert!(session.floating_editor(AnnotationKind::Abbreviation).is_some());
        assert!(session.floating_editor(AnnotationKind::LanguageTag).is_none());
    }

    #[test]
    fn test_register_enabled_follows_settings() {
        let mut settings = EditorSettings::default();
        settings.annotations.enabled = vec![AnnotationKind::LanguageTag];
        let mut session = EditorSession::new(EditorConfig::default(), settings);

        let installed = AnnotationPlugin::register_enabled(&mut session, || Box::new(NoLayout)).unwrap();
        assert_eq!(installed, 1);
        assert!(session.has_plugin(AnnotationKind::LanguageTag));
        assert!(!session.has_plugin(AnnotationKind::Abbreviation));
    }

    #[test]
    fn test_register_twice_is_harmless() {
        let mut session = EditorSession::new(EditorConfig::default(), EditorSettings::default());
        AnnotationPlugin::register(&mut session, AnnotationKind::LanguageTag, Box::new(NoLayout)).unwrap();
        AnnotationPlugin::register(&mut session, AnnotationKind::LanguageTag, Box::new(NoLayout)).unwrap();
        assert_eq!(session.handler_count(), 2);
    }
}
