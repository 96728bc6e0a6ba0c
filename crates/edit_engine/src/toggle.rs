//! Applying, updating and removing inline annotations across a selection
//!
//! One procedure serves both annotation kinds. Removing unwraps every
//! annotation that directly holds a selected node. Applying either updates
//! the single annotation around the selection in place, or walks the
//! selected nodes in document order and gathers each run of siblings into
//! one annotation, absorbing annotations of the same kind met on the way.

use crate::{EditError, Result};
use doc_model::{
    AnnotationFields, AnnotationKind, AnnotationNode, DocumentTree, NodeId, NodeKind, Position,
    Selection,
};
use serde::{Deserialize, Serialize};

/// What to apply. A missing payload means "remove".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TogglePayload {
    /// Field record to set. Missing fields are applied with an empty value.
    pub fields: Option<AnnotationFields>,
    /// Nodes captured before the selection could go stale, e.g. while a
    /// drawer was open
    pub selected_nodes: Option<Vec<NodeId>>,
    /// Plain text the annotation should end up holding
    pub text: Option<String>,
}

impl TogglePayload {
    pub fn new(fields: AnnotationFields) -> Self {
        Self {
            fields: Some(fields),
            ..Default::default()
        }
    }

    pub fn with_selected_nodes(mut self, nodes: Vec<NodeId>) -> Self {
        self.selected_nodes = Some(nodes);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// The fields to apply for `kind`, empty when none were given
    pub fn resolved_fields(&self, kind: AnnotationKind) -> AnnotationFields {
        match &self.fields {
            Some(fields) => fields.clone(),
            None => {
                tracing::trace!("No {} fields in toggle payload, applying an empty value", kind);
                kind.fields("")
            }
        }
    }
}

/// Effect of a toggle on the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Nothing to do: no usable selection, or nothing annotated to remove
    NoOp,
    /// Number of annotations unwrapped
    Removed(usize),
    /// The annotation around the selection was updated in place
    Updated(NodeId),
    /// Annotations now holding the selected content, in document order
    Wrapped(Vec<NodeId>),
}

impl ToggleOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, ToggleOutcome::NoOp)
    }
}

/// Outcome plus the selection to continue with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleResult {
    pub outcome: ToggleOutcome,
    pub selection: Option<Selection>,
}

impl ToggleResult {
    fn noop(selection: Option<&Selection>) -> Self {
        Self {
            outcome: ToggleOutcome::NoOp,
            selection: selection.copied(),
        }
    }
}

/// Toggle an annotation of `kind` on `tree`.
///
/// `selection` is the live range selection, if any. With a payload, the
/// nodes captured in `selected_nodes` are used unless the live selection
/// still covers exactly those nodes, in which case the live selection is
/// extracted so that partially selected text is split off. Without a
/// payload only the live selection is used.
///
/// A `NoOp` outcome leaves `tree` exactly as it was.
pub fn toggle_annotation(
    tree: &mut DocumentTree,
    selection: Option<&Selection>,
    kind: AnnotationKind,
    payload: Option<&TogglePayload>,
) -> Result<ToggleResult> {
    let Some(payload) = payload else {
        return remove_annotation(tree, selection, kind, None);
    };

    let fields = payload.resolved_fields(kind);
    if fields.kind() != kind {
        return Err(EditError::InvalidCommand(format!(
            "Cannot toggle {} with {} fields",
            kind,
            fields.kind()
        )));
    }

    let Some((nodes, refreshed)) = resolve_targets(tree, selection, payload.selected_nodes.as_deref())? else {
        tracing::debug!("Toggle {} skipped: nothing selected that can be annotated", kind);
        return Ok(ToggleResult::noop(selection));
    };

    let text = payload.text.as_deref();
    if let [single] = nodes.as_slice() {
        if let Some(annotation) = tree.matching_annotation(*single, kind) {
            update_annotation(tree, annotation, &fields, text)?;
            tracing::debug!("Updated {} annotation {} in place", kind, annotation);
            let selection = selection_covering(tree, &[annotation]).or(refreshed);
            return Ok(ToggleResult {
                outcome: ToggleOutcome::Updated(annotation),
                selection,
            });
        }
    }

    let wrapped = wrap_nodes(tree, &nodes, &fields, text)?;
    let pruned = tree.prune_empty_annotations();
    if pruned > 0 {
        tracing::trace!("Pruned {} emptied annotation(s)", pruned);
    }
    let wrapped: Vec<NodeId> = wrapped.into_iter().filter(|&id| tree.contains(id)).collect();
    if wrapped.is_empty() {
        return Ok(ToggleResult::noop(refreshed.as_ref()));
    }
    tracing::debug!("Applied {} to {} node(s) in {} annotation(s)", kind, nodes.len(), wrapped.len());
    let selection = selection_covering(tree, &wrapped).or(refreshed);
    Ok(ToggleResult {
        outcome: ToggleOutcome::Wrapped(wrapped),
        selection,
    })
}

/// Pick the nodes to work on, splitting boundary text when the live
/// selection is used. Returns `None`, without touching the tree, when none of
/// the nodes could be annotated.
fn resolve_targets(
    tree: &mut DocumentTree,
    selection: Option<&Selection>,
    captured: Option<&[NodeId]>,
) -> Result<Option<(Vec<NodeId>, Option<Selection>)>> {
    match pick_source(tree, selection, captured) {
        Targets::Live(live) => {
            if !tree.covered_nodes(&live).iter().any(|&id| is_wrappable(tree, id)) {
                return Ok(None);
            }
            let (nodes, refreshed) = tree.extract(&live)?;
            Ok(Some((nodes, Some(refreshed))))
        }
        Targets::Captured(nodes, live) => {
            if !nodes.iter().any(|&id| is_wrappable(tree, id)) {
                return Ok(None);
            }
            Ok(Some((nodes, live)))
        }
        Targets::Nothing => Ok(None),
    }
}

/// Where the nodes of a toggle come from
enum Targets {
    /// Extract the live selection
    Live(Selection),
    /// Captured nodes still in the tree, plus the live selection to keep
    Captured(Vec<NodeId>, Option<Selection>),
    Nothing,
}

/// Captured nodes win over the live selection, unless the live selection
/// still covers exactly those nodes
fn pick_source(tree: &DocumentTree, selection: Option<&Selection>, captured: Option<&[NodeId]>) -> Targets {
    let live = selection
        .filter(|s| tree.contains(s.anchor.node_id) && tree.contains(s.focus.node_id))
        .copied();
    let captured = captured.filter(|nodes| !nodes.is_empty());

    match (captured, live) {
        (Some(nodes), Some(live)) if tree.selected_nodes(&live) == nodes => Targets::Live(live),
        (Some(nodes), _) => {
            let nodes: Vec<NodeId> = nodes.iter().copied().filter(|&id| tree.contains(id)).collect();
            if nodes.is_empty() {
                return Targets::Nothing;
            }
            Targets::Captured(nodes, live)
        }
        (None, Some(live)) => Targets::Live(live),
        (None, None) => Targets::Nothing,
    }
}

/// Inline content with a parent; blocks and the root are never wrapped
fn is_wrappable(tree: &DocumentTree, id: NodeId) -> bool {
    tree.parent(id).is_some() && tree.get(id).is_some_and(|n| !n.kind.is_element() || n.kind.is_inline())
}

fn has_annotated_parent(tree: &DocumentTree, nodes: &[NodeId], kind: AnnotationKind) -> bool {
    nodes.iter().any(|&id| {
        tree.parent(id)
            .and_then(|parent| tree.get(parent))
            .is_some_and(|p| p.kind.is_annotation_of(kind))
    })
}

/// Unwrap every annotation of `kind` that directly holds a target node.
///
/// Targets are picked the same way as for applying: `selected_nodes`, the
/// nodes captured when a drawer opened, are used when the live selection is
/// gone or has moved elsewhere. A `NoOp` outcome leaves `tree` untouched.
pub fn remove_annotation(
    tree: &mut DocumentTree,
    selection: Option<&Selection>,
    kind: AnnotationKind,
    selected_nodes: Option<&[NodeId]>,
) -> Result<ToggleResult> {
    let (nodes, refreshed) = match pick_source(tree, selection, selected_nodes) {
        Targets::Live(live) => {
            if !has_annotated_parent(tree, &tree.covered_nodes(&live), kind) {
                return Ok(ToggleResult::noop(selection));
            }
            let (nodes, refreshed) = tree.extract(&live)?;
            (nodes, Some(refreshed))
        }
        Targets::Captured(nodes, live) => {
            if !has_annotated_parent(tree, &nodes, kind) {
                return Ok(ToggleResult::noop(selection));
            }
            (nodes, live)
        }
        Targets::Nothing => return Ok(ToggleResult::noop(selection)),
    };

    let mut removed = 0;
    for node in nodes {
        let Some(parent) = tree.parent(node) else {
            continue;
        };
        if tree.get(parent).is_some_and(|p| p.kind.is_annotation_of(kind)) {
            tree.unwrap_node(parent)?;
            removed += 1;
        }
    }

    let selection = refreshed.filter(|s| tree.contains(s.anchor.node_id) && tree.contains(s.focus.node_id));
    tracing::debug!("Removed {} {} annotation(s)", removed, kind);
    Ok(ToggleResult {
        outcome: ToggleOutcome::Removed(removed),
        selection,
    })
}

/// Set the fields of an existing annotation and, when `text` differs from
/// its content, replace all of its children with that text
fn update_annotation(
    tree: &mut DocumentTree,
    annotation: NodeId,
    fields: &AnnotationFields,
    text: Option<&str>,
) -> Result<()> {
    if let Some(node) = tree.annotation_mut(annotation) {
        node.set_fields(fields.clone());
    }
    let Some(text) = text else {
        return Ok(());
    };
    if text == tree.text_content(annotation) {
        return Ok(());
    }
    let children = tree.children(annotation);
    let loses_formatting = children.len() > 1
        || children.iter().any(|&c| {
            tree.get(c)
                .and_then(|n| n.kind.as_text())
                .map_or(true, |t| !t.format.is_plain())
        });
    if loses_formatting {
        tracing::warn!(
            "Replacing content of annotation {} with plain text, nested formatting is discarded",
            annotation
        );
    }
    tree.replace_children_with_text(annotation, text)?;
    Ok(())
}

/// Gather the nodes into annotations, one per run of siblings
fn wrap_nodes(
    tree: &mut DocumentTree,
    nodes: &[NodeId],
    fields: &AnnotationFields,
    text: Option<&str>,
) -> Result<Vec<NodeId>> {
    let kind = fields.kind();
    let mut prev_parent: Option<NodeId> = None;
    let mut current: Option<NodeId> = None;
    let mut touched: Vec<NodeId> = Vec::new();

    for &node in nodes {
        let Some(parent) = tree.parent(node) else {
            continue;
        };
        // Already inside the annotation being built
        if current.is_some_and(|c| c == parent || tree.is_ancestor_of(c, node)) {
            continue;
        }
        let Some(node_kind) = tree.get(node).map(|n| n.kind.clone()) else {
            continue;
        };
        if node_kind.is_element() && !node_kind.is_inline() {
            continue;
        }

        if tree.get(parent).is_some_and(|p| p.kind.is_annotation_of(kind)) {
            // Adopt the existing annotation; later siblings of it merge in
            current = Some(parent);
            prev_parent = tree.parent(parent);
            update_annotation(tree, parent, fields, text)?;
            touched.push(parent);
            continue;
        }

        if prev_parent != Some(parent) {
            prev_parent = Some(parent);
            let wrapper = tree.create_node(NodeKind::Annotation(AnnotationNode::new(fields.clone(), None)));
            tree.insert_before(node, wrapper)?;
            current = Some(wrapper);
            touched.push(wrapper);
        }
        let Some(target) = current else {
            continue;
        };

        if node_kind.is_annotation_of(kind) {
            if node == target {
                continue;
            }
            for child in tree.children(node).to_vec() {
                tree.append_child(target, child)?;
            }
            tree.remove(node)?;
            continue;
        }

        tree.append_child(target, node)?;
    }

    touched.dedup();
    Ok(touched)
}

/// Selection from the start of the first text to the end of the last text
/// inside `annotations`
fn selection_covering(tree: &DocumentTree, annotations: &[NodeId]) -> Option<Selection> {
    let texts: Vec<NodeId> = tree
        .document_order()
        .into_iter()
        .filter(|&id| tree.get(id).is_some_and(|n| n.kind.as_text().is_some()))
        .filter(|&id| annotations.iter().any(|&a| tree.is_ancestor_of(a, id)))
        .collect();
    let first = *texts.first()?;
    let last = *texts.last()?;
    Some(Selection::new(
        Position::start_of(first),
        Position::new(last, tree.char_len(last)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{AnnotationId, NodeType, TextFormat, TextNode};

    fn lang(value: &str) -> TogglePayload {
        TogglePayload::new(AnnotationFields::language_tag(value))
    }

    #[test]
    fn test_wrap_partial_text() {
        let (mut tree, para_id, text_id) = DocumentTree::with_text("Das ist ein Block.");
        let selection = Selection::within(text_id, 12, 17);

        let result =
            toggle_annotation(&mut tree, Some(&selection), AnnotationKind::LanguageTag, Some(&lang("de")))
                .unwrap();

        let ToggleOutcome::Wrapped(ids) = &result.outcome else {
            panic!("expected a wrap, got {:?}", result.outcome);
        };
        assert_eq!(ids.len(), 1);
        assert_eq!(tree.children(para_id).len(), 3);
        assert_eq!(tree.children(para_id)[1], ids[0]);
        assert_eq!(tree.text_content(ids[0]), "Block");
        assert_eq!(tree.annotation(ids[0]).unwrap().value(), "de");
        assert_eq!(tree.text_content(para_id), "Das ist ein Block.");
        assert!(tree.check_invariants().is_ok());

        let selection = result.selection.unwrap();
        assert_eq!(tree.selection_text(&selection), "Block");
    }

    #[test]
    fn test_no_selection_is_noop() {
        let (mut tree, _, _) = DocumentTree::with_text("text");
        let before = tree.to_snapshot();
        let result = toggle_annotation(&mut tree, None, AnnotationKind::Abbreviation, Some(&TogglePayload::default()))
            .unwrap();
        assert!(result.outcome.is_noop());
        assert_eq!(tree.to_snapshot(), before);
    }

    #[test]
    fn test_missing_fields_apply_empty_value() {
        let (mut tree, _, text_id) = DocumentTree::with_text("EU");
        let selection = Selection::within(text_id, 0, 2);
        toggle_annotation(&mut tree, Some(&selection), AnnotationKind::Abbreviation, Some(&TogglePayload::default()))
            .unwrap();
        let ids = tree.annotations(AnnotationKind::Abbreviation);
        assert_eq!(ids.len(), 1);
        assert_eq!(tree.annotation(ids[0]).unwrap().value(), "");
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let (mut tree, _, text_id) = DocumentTree::with_text("EU");
        let selection = Selection::within(text_id, 0, 2);
        let result = toggle_annotation(&mut tree, Some(&selection), AnnotationKind::Abbreviation, Some(&lang("de")));
        assert!(matches!(result, Err(EditError::InvalidCommand(_))));
    }

    #[test]
    fn test_update_in_place_replaces_text() {
        let (mut tree, para_id, _) = DocumentTree::with_text("Das ist ein ");
        let annotation = AnnotationNode::new(AnnotationFields::language_tag("de"), Some(AnnotationId::new("a1")));
        let annotation_id = tree.append_annotation(para_id, annotation).unwrap();
        let inner = tree.append_text(annotation_id, "Block").unwrap();

        let payload = lang("fr").with_selected_nodes(vec![inner]).with_text("Bloc");
        let result = toggle_annotation(&mut tree, None, AnnotationKind::LanguageTag, Some(&payload)).unwrap();

        assert_eq!(result.outcome, ToggleOutcome::Updated(annotation_id));
        let node = tree.annotation(annotation_id).unwrap();
        assert_eq!(node.value(), "fr");
        assert_eq!(node.id().as_str(), "a1");
        assert_eq!(tree.text_content(annotation_id), "Bloc");
        assert_eq!(tree.annotations(AnnotationKind::LanguageTag).len(), 1);
    }

    #[test]
    fn test_update_discards_nested_formatting() {
        let (mut tree, para_id, _) = DocumentTree::with_text("");
        let annotation_id = tree
            .append_annotation(para_id, AnnotationNode::new(AnnotationFields::abbreviation("x"), None))
            .unwrap();
        tree.append_new(annotation_id, NodeKind::Text(TextNode::with_format("W", TextFormat::BOLD)))
            .unwrap();
        tree.append_text(annotation_id, "HO").unwrap();

        let payload = TogglePayload::new(AnnotationFields::abbreviation("World Health Organization"))
            .with_selected_nodes(vec![annotation_id])
            .with_text("who");
        toggle_annotation(&mut tree, None, AnnotationKind::Abbreviation, Some(&payload)).unwrap();

        let children = tree.children(annotation_id);
        assert_eq!(children.len(), 1);
        assert_eq!(tree.node_type(children[0]), Some(NodeType::Text));
        assert_eq!(tree.text_content(annotation_id), "who");
    }

    #[test]
    fn test_stale_capture_falls_back_to_captured_nodes() {
        let (mut tree, para_id, first) = DocumentTree::with_text("one ");
        let second = tree.append_text(para_id, "two").unwrap();
        // The live selection moved to another node after the capture
        let live = Selection::within(first, 0, 2);
        let payload = TogglePayload::new(AnnotationFields::abbreviation("2")).with_selected_nodes(vec![second]);

        let result = toggle_annotation(&mut tree, Some(&live), AnnotationKind::Abbreviation, Some(&payload)).unwrap();
        let ToggleOutcome::Wrapped(ids) = result.outcome else {
            panic!("expected a wrap");
        };
        assert_eq!(tree.text_content(ids[0]), "two");
        assert_eq!(tree.char_len(first), 4);
    }

    #[test]
    fn test_wrap_across_blocks_creates_one_wrapper_per_block() {
        let (mut tree, first_para, first_text) = DocumentTree::with_text("alpha");
        let second_para = tree.append_paragraph();
        let second_text = tree.append_text(second_para, "beta").unwrap();
        let selection = Selection::new(Position::new(first_text, 2), Position::new(second_text, 2));

        let result =
            toggle_annotation(&mut tree, Some(&selection), AnnotationKind::LanguageTag, Some(&lang("en")))
                .unwrap();

        let ToggleOutcome::Wrapped(ids) = result.outcome else {
            panic!("expected a wrap");
        };
        assert_eq!(ids.len(), 2);
        assert_eq!(tree.parent(ids[0]), Some(first_para));
        assert_eq!(tree.parent(ids[1]), Some(second_para));
        assert_eq!(tree.text_content(ids[0]), "pha");
        assert_eq!(tree.text_content(ids[1]), "be");
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_wrap_around_other_kind_does_not_nest_same_kind() {
        let (mut tree, para_id, first) = DocumentTree::with_text("a ");
        let other = tree
            .append_annotation(para_id, AnnotationNode::new(AnnotationFields::language_tag("de"), None))
            .unwrap();
        tree.append_text(other, "b").unwrap();
        let last = tree.append_text(para_id, " c").unwrap();
        let selection = Selection::new(Position::new(first, 0), Position::new(last, 2));

        toggle_annotation(
            &mut tree,
            Some(&selection),
            AnnotationKind::Abbreviation,
            Some(&TogglePayload::new(AnnotationFields::abbreviation("abc"))),
        )
        .unwrap();

        let abbrs = tree.annotations(AnnotationKind::Abbreviation);
        assert_eq!(abbrs.len(), 1);
        assert_eq!(tree.text_content(abbrs[0]), "a b c");
        assert_eq!(tree.parent(other), Some(abbrs[0]));
        assert_eq!(tree.annotation(other).unwrap().value(), "de");
    }

    #[test]
    fn test_remove_unwraps_in_place() {
        let (mut tree, para_id, _) = DocumentTree::with_text("x ");
        let annotation_id = tree
            .append_annotation(para_id, AnnotationNode::new(AnnotationFields::abbreviation("y"), None))
            .unwrap();
        let inner = tree.append_text(annotation_id, "yy").unwrap();
        let tail = tree.append_text(para_id, " z").unwrap();

        let selection = Selection::within(inner, 0, 2);
        let result = toggle_annotation(&mut tree, Some(&selection), AnnotationKind::Abbreviation, None).unwrap();

        assert_eq!(result.outcome, ToggleOutcome::Removed(1));
        assert!(!tree.contains(annotation_id));
        assert_eq!(tree.children(para_id)[1], inner);
        assert_eq!(tree.children(para_id)[2], tail);
    }

    #[test]
    fn test_remove_ignores_other_kind() {
        let (mut tree, para_id, _) = DocumentTree::with_text("");
        let annotation_id = tree
            .append_annotation(para_id, AnnotationNode::new(AnnotationFields::language_tag("de"), None))
            .unwrap();
        let inner = tree.append_text(annotation_id, "Haus").unwrap();

        let selection = Selection::within(inner, 0, 4);
        let result = toggle_annotation(&mut tree, Some(&selection), AnnotationKind::Abbreviation, None).unwrap();
        assert!(result.outcome.is_noop());
        assert!(tree.contains(annotation_id));
    }

    #[test]
    fn test_remove_from_plain_text_leaves_tree_alone() {
        let (mut tree, para_id, text_id) = DocumentTree::with_text("abcdef");
        let before = tree.to_snapshot();
        let selection = Selection::within(text_id, 2, 4);

        let result = toggle_annotation(&mut tree, Some(&selection), AnnotationKind::LanguageTag, None).unwrap();

        assert!(result.outcome.is_noop());
        assert_eq!(result.selection, Some(selection));
        assert_eq!(tree.children(para_id), &[text_id]);
        assert_eq!(tree.to_snapshot(), before);
    }

    #[test]
    fn test_apply_without_inline_content_leaves_tree_alone() {
        let (mut tree, para_id, _) = DocumentTree::with_text("abc");
        let before = tree.to_snapshot();
        let selection = Selection::collapsed(Position::start_of(para_id));

        let result =
            toggle_annotation(&mut tree, Some(&selection), AnnotationKind::LanguageTag, Some(&lang("de"))).unwrap();

        assert!(result.outcome.is_noop());
        assert_eq!(tree.to_snapshot(), before);
    }

    #[test]
    fn test_remove_uses_captured_nodes_without_selection() {
        let (mut tree, para_id, _) = DocumentTree::with_text("I love ");
        let annotation_id = tree
            .append_annotation(para_id, AnnotationNode::new(AnnotationFields::abbreviation("Unicode"), None))
            .unwrap();
        let inner = tree.append_text(annotation_id, "UTF-8").unwrap();

        assert!(toggle_annotation(&mut tree, None, AnnotationKind::Abbreviation, None)
            .unwrap()
            .outcome
            .is_noop());

        let result = remove_annotation(&mut tree, None, AnnotationKind::Abbreviation, Some(&[inner][..])).unwrap();
        assert_eq!(result.outcome, ToggleOutcome::Removed(1));
        assert_eq!(result.selection, None);
        assert!(!tree.contains(annotation_id));
        assert_eq!(tree.parent(inner), Some(para_id));
        assert_eq!(tree.text_content(para_id), "I love UTF-8");
    }

    #[test]
    fn test_remove_with_captured_nodes_of_other_kind_is_noop() {
        let (mut tree, para_id, text_id) = DocumentTree::with_text("plain ");
        let annotation_id = tree
            .append_annotation(para_id, AnnotationNode::new(AnnotationFields::language_tag("de"), None))
            .unwrap();
        let inner = tree.append_text(annotation_id, "Haus").unwrap();
        let before = tree.to_snapshot();

        let result =
            remove_annotation(&mut tree, None, AnnotationKind::Abbreviation, Some(&[text_id, inner][..])).unwrap();
        assert!(result.outcome.is_noop());
        assert_eq!(tree.to_snapshot(), before);
    }
}
