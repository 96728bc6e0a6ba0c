//! Toggle an annotation on a snapshot from the command line

use super::{emit, read_snapshot};
use anyhow::{bail, Context, Result};
use doc_model::{AnnotationKind, DocumentTree, NodeId, Selection};
use edit_engine::{EditorCommand, EditorSession, EditorSettings, TogglePayload};
use std::path::Path;

pub struct AnnotateOptions {
    pub kind: AnnotationKind,
    /// Text to select
    pub find: String,
    /// `None` removes the annotation
    pub value: Option<String>,
}

/// Select the first occurrence of `opts.find` and toggle the annotation on it
pub fn annotate(input: &Path, output: Option<&Path>, settings: &EditorSettings, opts: AnnotateOptions) -> Result<()> {
    if !settings.annotations.is_enabled(opts.kind) {
        bail!("{} annotations are disabled in the settings", opts.kind);
    }
    let tree = read_snapshot(input)?;
    let Some(selection) = find_text(&tree, &opts.find) else {
        bail!("Text '{}' not found in {}", opts.find, input.display());
    };

    let payload = match opts.value {
        Some(value) => {
            let fields = opts.kind.fields(value);
            fields
                .validate()
                .with_context(|| format!("Invalid {} value", opts.kind.field_name()))?;
            Some(TogglePayload::new(fields))
        }
        None => None,
    };

    let mut session = EditorSession::with_default_plugins(settings.clone(), tree)?;
    session.set_selection(Some(selection))?;
    session.dispatch(EditorCommand::ToggleAnnotation {
        kind: opts.kind,
        payload,
    })?;
    tracing::debug!(
        "{} {} annotation(s) in the document",
        session.tree().annotations(opts.kind).len(),
        opts.kind
    );

    let json = serde_json::to_string_pretty(&session.tree().to_snapshot())?;
    emit(&json, output)
}

/// Selection of the first occurrence of `needle` inside a single text node
fn find_text(tree: &DocumentTree, needle: &str) -> Option<Selection> {
    if needle.is_empty() {
        return None;
    }
    tree.document_order().into_iter().find_map(|id: NodeId| {
        let text = &tree.get(id)?.kind.as_text()?.text;
        let byte_start = text.find(needle)?;
        let start = text[..byte_start].chars().count();
        let end = start + needle.chars().count();
        Some(Selection::within(id, start, end))
    })
}
