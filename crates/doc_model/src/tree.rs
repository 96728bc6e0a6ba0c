//! Document tree storage and structural operations

use crate::{
    AnnotationKind, AnnotationNode, DocModelError, ElementAttributes, Node, NodeId, NodeKind,
    NodeType, Position, Result, Selection, TextNode,
};
use std::cmp::Ordering;
use std::collections::HashMap;

/// The document tree: an arena of nodes hanging off a single root.
///
/// Each attached node has exactly one parent. Cloning the tree produces an
/// independent copy, which is how commands build the next document state.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    /// Version counter for tracking changes
    version: u64,
}

impl DocumentTree {
    /// Create a tree holding only the root
    pub fn new() -> Self {
        let root = Node::new(NodeKind::Root(ElementAttributes::default()));
        let root_id = root.id();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            root: root_id,
            nodes,
            version: 0,
        }
    }

    /// Create a tree with one paragraph holding `text`.
    ///
    /// Returns the tree, the paragraph id and the text node id.
    pub fn with_text(text: impl Into<String>) -> (Self, NodeId, NodeId) {
        let mut tree = Self::new();
        let para_id = tree.append_paragraph();
        let text_id = tree.create_node(NodeKind::Text(TextNode::new(text)));
        tree.attach_last(para_id, text_id);
        (tree, para_id, text_id)
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    /// Number of nodes in the arena, the root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has no children
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access to a node's kind. Structure is only changed through the
    /// tree's own operations.
    pub fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        let node = self.nodes.get_mut(&id)?;
        self.version += 1;
        Some(&mut node.kind)
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.nodes.get(&id).map(|n| n.node_type())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|n| n.children()).unwrap_or(&[])
    }

    pub fn annotation(&self, id: NodeId) -> Option<&AnnotationNode> {
        self.nodes.get(&id).and_then(|n| n.kind.as_annotation())
    }

    pub fn annotation_mut(&mut self, id: NodeId) -> Option<&mut AnnotationNode> {
        let node = self.nodes.get_mut(&id)?;
        let annotation = node.kind.as_annotation_mut()?;
        self.version += 1;
        Some(annotation)
    }

    fn node_or_err(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(DocModelError::NodeNotFound(id.as_uuid()))
    }

    fn node_mut_or_err(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(DocModelError::NodeNotFound(id.as_uuid()))
    }

    // =========================================================================
    // Construction helpers
    // =========================================================================

    /// Add a node to the arena without attaching it
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let node = Node::new(kind);
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    // Only valid for a fresh node and an existing element parent.
    fn attach_last(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        self.touch();
    }

    /// Append an empty paragraph to the root
    pub fn append_paragraph(&mut self) -> NodeId {
        let id = self.create_node(NodeKind::Paragraph(ElementAttributes::default()));
        self.attach_last(self.root, id);
        id
    }

    /// Create a node of `kind` and append it to `parent`
    pub fn append_new(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId> {
        let id = self.create_node(kind);
        if let Err(e) = self.append_child(parent, id) {
            self.nodes.remove(&id);
            return Err(e);
        }
        Ok(id)
    }

    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> Result<NodeId> {
        self.append_new(parent, NodeKind::Text(TextNode::new(text)))
    }

    pub fn append_annotation(&mut self, parent: NodeId, annotation: AnnotationNode) -> Result<NodeId> {
        self.append_new(parent, NodeKind::Annotation(annotation))
    }

    // =========================================================================
    // Structural mutation
    // =========================================================================

    /// Check whether `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn check_can_adopt(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_node = self.node_or_err(parent)?;
        self.node_or_err(child)?;
        if !parent_node.kind.is_element() {
            return Err(DocModelError::InvalidOperation(format!(
                "{} nodes cannot have children",
                parent_node.node_type().type_tag()
            )));
        }
        if child == self.root {
            return Err(DocModelError::TreeStructureError("The root cannot be moved".into()));
        }
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(DocModelError::TreeStructureError(
                "A node cannot be moved inside itself".into(),
            ));
        }
        Ok(())
    }

    /// Detach a node from its parent. The node and its subtree stay in the arena.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node_or_err(id)?.parent;
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                parent_node.children.retain(|&c| c != id);
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.parent = None;
            }
            self.touch();
        }
        Ok(())
    }

    /// Move `child` to position `index` of `parent`'s children.
    ///
    /// The index is interpreted after `child` has left its old position.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.check_can_adopt(parent, child)?;
        self.detach(child)?;
        let parent_node = self.node_mut_or_err(parent)?;
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.node_mut_or_err(child)?.parent = Some(parent);
        self.touch();
        Ok(())
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Move `node` immediately before `sibling`
    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) -> Result<()> {
        self.insert_next_to(sibling, node, 0)
    }

    /// Move `node` immediately after `sibling`
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) -> Result<()> {
        self.insert_next_to(sibling, node, 1)
    }

    fn insert_next_to(&mut self, sibling: NodeId, node: NodeId, shift: usize) -> Result<()> {
        if sibling == node {
            return Ok(());
        }
        let parent = self.parent(sibling).ok_or_else(|| {
            DocModelError::TreeStructureError(format!("Node {} has no parent", sibling))
        })?;
        self.check_can_adopt(parent, node)?;
        self.detach(node)?;
        let index = self
            .index_in_parent(sibling)
            .ok_or(DocModelError::NodeNotFound(sibling.as_uuid()))?;
        self.insert_child(parent, index + shift, node)
    }

    /// Remove a node and its whole subtree from the tree
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(DocModelError::InvalidOperation("The root cannot be removed".into()));
        }
        self.detach(id)?;
        let mut doomed = vec![id];
        while let Some(next) = doomed.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                doomed.extend(node.children);
            }
        }
        self.touch();
        Ok(())
    }

    /// Splice a node's children into its parent at the node's position, then
    /// remove the emptied node
    pub fn unwrap_node(&mut self, id: NodeId) -> Result<()> {
        let parent = self.parent(id).ok_or_else(|| {
            DocModelError::TreeStructureError(format!("Node {} has no parent", id))
        })?;
        let index = self
            .index_in_parent(id)
            .ok_or(DocModelError::NodeNotFound(id.as_uuid()))?;
        let children = self.children(id).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child)?;
        }
        self.remove(id)
    }

    /// Drop every child of `id` and give it a single plain text child
    pub fn replace_children_with_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<NodeId> {
        let old_children = self.children(id).to_vec();
        let text_id = self.append_text(id, text)?;
        for child in old_children {
            self.remove(child)?;
        }
        Ok(text_id)
    }

    /// Remove annotation nodes left without children. Returns how many were removed.
    pub fn prune_empty_annotations(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let empty: Vec<NodeId> = self
                .nodes
                .values()
                .filter(|n| !n.kind.can_be_empty() && n.children.is_empty())
                .map(|n| n.id())
                .collect();
            if empty.is_empty() {
                return removed;
            }
            for id in empty {
                if self.remove(id).is_ok() {
                    removed += 1;
                }
            }
        }
    }

    /// Split a text node at a char offset.
    ///
    /// The original node keeps the text before `offset`; the returned new node
    /// holds the rest and is inserted right after it. Offsets at either end
    /// split nothing and return `None`.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<Option<NodeId>> {
        let text = self
            .node_or_err(id)?
            .kind
            .as_text()
            .cloned()
            .ok_or_else(|| DocModelError::InvalidOperation("Only text nodes can be split".into()))?;
        let len = text.char_len();
        if offset > len {
            return Err(DocModelError::InvalidPosition {
                node_id: id.as_uuid(),
                offset,
            });
        }
        if offset == 0 || offset == len {
            return Ok(None);
        }
        let byte_index = text
            .text
            .char_indices()
            .nth(offset)
            .map(|(i, _)| i)
            .unwrap_or(text.text.len());
        let (head, tail) = text.text.split_at(byte_index);
        let right = self.create_node(NodeKind::Text(TextNode::with_format(tail, text.format)));
        if let Some(NodeKind::Text(left)) = self.kind_mut(id) {
            left.text = head.to_string();
        }
        self.insert_after(id, right)?;
        Ok(Some(right))
    }

    /// Insert a new paragraph after the block containing `id`.
    ///
    /// When `id` sits inside an annotation, the new block starts with an empty
    /// annotation carrying the same fields, and that annotation is returned;
    /// otherwise the new block itself is returned.
    pub fn insert_new_block_after(&mut self, id: NodeId) -> Result<NodeId> {
        let block = self
            .find_matching_parent(id, |n| !n.kind.is_inline())
            .filter(|&b| b != self.root)
            .ok_or_else(|| {
                DocModelError::TreeStructureError(format!("Node {} is not inside a block", id))
            })?;
        let new_block = self.create_node(NodeKind::Paragraph(ElementAttributes::default()));
        self.insert_after(block, new_block)?;

        let enclosing = self
            .find_matching_parent(id, |n| n.kind.as_annotation().is_some())
            .and_then(|a| self.annotation(a))
            .map(|a| a.fields().clone());
        match enclosing {
            Some(fields) => {
                let reopened = AnnotationNode::new(fields, None);
                self.append_annotation(new_block, reopened)
            }
            None => Ok(new_block),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_in_parent(id)?;
        let parent = self.parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_in_parent(id)?;
        let parent = self.parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Plain text of a subtree. Line breaks become `\n`, blocks are separated
    /// by a blank line.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&text.text),
            NodeKind::LineBreak => out.push('\n'),
            _ => {
                let count = node.children.len();
                for (i, &child) in node.children.iter().enumerate() {
                    self.collect_text(child, out);
                    let is_block = self.nodes.get(&child).is_some_and(|c| !c.kind.is_inline());
                    if is_block && i + 1 < count {
                        out.push_str("\n\n");
                    }
                }
            }
        }
    }

    /// Nearest node, starting at `id` itself, that satisfies `predicate`
    pub fn find_matching_parent(&self, id: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.nodes.get(&node_id)?;
            if predicate(node) {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }

    /// Nearest strict ancestor of `id` that satisfies `predicate`
    pub fn find_ancestor(&self, id: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.find_matching_parent(parent, predicate)
    }

    /// Nearest strict ancestor annotation of `kind`
    pub fn annotation_ancestor(&self, id: NodeId, kind: AnnotationKind) -> Option<NodeId> {
        self.find_ancestor(id, |n| n.kind.is_annotation_of(kind))
    }

    /// Nearest annotation of `kind`, `id` included
    pub fn matching_annotation(&self, id: NodeId, kind: AnnotationKind) -> Option<NodeId> {
        self.find_matching_parent(id, |n| n.kind.is_annotation_of(kind))
    }

    /// All attached nodes in document (pre-)order, the root first
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// Attached annotation nodes of `kind`, in document order
    pub fn annotations(&self, kind: AnnotationKind) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|&id| self.nodes.get(&id).is_some_and(|n| n.kind.is_annotation_of(kind)))
            .collect()
    }

    /// Compare two attached nodes by document order
    pub fn compare_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        for id in self.document_order() {
            if id == a {
                return Ordering::Less;
            }
            if id == b {
                return Ordering::Greater;
            }
        }
        Ordering::Equal
    }

    /// Nodes from `a` to `b` inclusive in document order.
    ///
    /// Ancestors of the first node are not included; elements entered along the
    /// way are.
    pub fn nodes_between(&self, a: NodeId, b: NodeId) -> Vec<NodeId> {
        let order = self.document_order();
        let pos_a = order.iter().position(|&id| id == a);
        let pos_b = order.iter().position(|&id| id == b);
        match (pos_a, pos_b) {
            (Some(x), Some(y)) => {
                let (start, end) = if x <= y { (x, y) } else { (y, x) };
                order[start..=end].to_vec()
            }
            _ => Vec::new(),
        }
    }

    /// Start and end of a selection in document order
    pub fn ordered_positions(&self, selection: &Selection) -> (Position, Position) {
        let (anchor, focus) = (selection.anchor, selection.focus);
        let backward = match self.compare_order(anchor.node_id, focus.node_id) {
            Ordering::Greater => true,
            Ordering::Equal => anchor.offset > focus.offset,
            Ordering::Less => false,
        };
        if backward {
            (focus, anchor)
        } else {
            (anchor, focus)
        }
    }

    /// Nodes touched by a selection, without modifying the tree.
    ///
    /// A collapsed selection yields the caret's node.
    pub fn selected_nodes(&self, selection: &Selection) -> Vec<NodeId> {
        if !self.contains(selection.anchor.node_id) || !self.contains(selection.focus.node_id) {
            return Vec::new();
        }
        if selection.is_collapsed() {
            return vec![selection.anchor.node_id];
        }
        let (start, end) = self.ordered_positions(selection);
        self.nodes_between(start.node_id, end.node_id)
    }

    /// Nodes `extract` would return for a selection, looked up before any
    /// text is split.
    ///
    /// Boundary text nodes are left out when none of their text is selected.
    pub fn covered_nodes(&self, selection: &Selection) -> Vec<NodeId> {
        let mut nodes = self.selected_nodes(selection);
        if selection.is_collapsed() || selection.anchor.node_id == selection.focus.node_id {
            return nodes;
        }
        let (start, end) = self.ordered_positions(selection);
        if self.node_type(start.node_id) == Some(NodeType::Text) && start.offset >= self.char_len(start.node_id) {
            nodes.retain(|&id| id != start.node_id);
        }
        if self.node_type(end.node_id) == Some(NodeType::Text) && end.offset == 0 {
            nodes.retain(|&id| id != end.node_id);
        }
        nodes
    }

    /// Text covered by a selection
    pub fn selection_text(&self, selection: &Selection) -> String {
        if selection.is_collapsed() {
            return String::new();
        }
        let (start, end) = self.ordered_positions(selection);
        let mut out = String::new();
        for id in self.nodes_between(start.node_id, end.node_id) {
            match self.nodes.get(&id).map(|n| &n.kind) {
                Some(NodeKind::Text(text)) => {
                    let from = if id == start.node_id { start.offset } else { 0 };
                    let to = if id == end.node_id { end.offset } else { text.char_len() };
                    out.extend(text.text.chars().skip(from).take(to.saturating_sub(from)));
                }
                Some(NodeKind::LineBreak) => out.push('\n'),
                _ => {}
            }
        }
        out
    }

    /// Isolate the selected content as whole nodes.
    ///
    /// Text nodes at the boundaries are split so that only the selected part is
    /// returned. Also returns a selection spanning exactly the extracted nodes.
    /// A collapsed selection extracts the caret's node without splitting.
    pub fn extract(&mut self, selection: &Selection) -> Result<(Vec<NodeId>, Selection)> {
        self.node_or_err(selection.anchor.node_id)?;
        self.node_or_err(selection.focus.node_id)?;
        if selection.is_collapsed() {
            return Ok((vec![selection.anchor.node_id], *selection));
        }

        let (start, end) = self.ordered_positions(selection);
        let mut nodes = self.nodes_between(start.node_id, end.node_id);

        if start.node_id == end.node_id {
            let mut target = start.node_id;
            if self.node_type(target) == Some(NodeType::Text) {
                if let Some(right) = self.split_text(target, start.offset)? {
                    target = right;
                }
                self.split_text(target, end.offset - start.offset)?;
            }
            let len = self.char_len(target);
            return Ok((vec![target], Selection::within(target, 0, len)));
        }

        if self.node_type(start.node_id) == Some(NodeType::Text) {
            let len = self.char_len(start.node_id);
            if start.offset >= len {
                nodes.retain(|&id| id != start.node_id);
            } else if let Some(right) = self.split_text(start.node_id, start.offset)? {
                if let Some(slot) = nodes.iter_mut().find(|id| **id == start.node_id) {
                    *slot = right;
                }
            }
        }
        if self.node_type(end.node_id) == Some(NodeType::Text) {
            if end.offset == 0 {
                nodes.retain(|&id| id != end.node_id);
            } else {
                self.split_text(end.node_id, end.offset)?;
            }
        }

        let first_text = nodes.iter().copied().find(|&id| self.node_type(id) == Some(NodeType::Text));
        let last_text = nodes.iter().rev().copied().find(|&id| self.node_type(id) == Some(NodeType::Text));
        let refreshed = match (first_text, last_text) {
            (Some(first), Some(last)) => Selection::new(
                Position::start_of(first),
                Position::new(last, self.char_len(last)),
            ),
            _ => *selection,
        };
        Ok((nodes, refreshed))
    }

    /// Length in chars of a text node, zero for anything else
    pub fn char_len(&self, id: NodeId) -> usize {
        self.nodes
            .get(&id)
            .and_then(|n| n.kind.as_text())
            .map(|t| t.char_len())
            .unwrap_or(0)
    }

    /// Verify parent links and the annotation invariants of every attached node
    pub fn check_invariants(&self) -> Result<()> {
        for id in self.document_order() {
            let node = self.node_or_err(id)?;
            for &child in node.children() {
                let child_node = self.node_or_err(child)?;
                if child_node.parent != Some(id) {
                    return Err(DocModelError::TreeStructureError(format!(
                        "Node {} is listed under {} but points elsewhere",
                        child, id
                    )));
                }
            }
            if let NodeKind::Annotation(annotation) = &node.kind {
                if node.children.is_empty() {
                    return Err(DocModelError::TreeStructureError(format!(
                        "{} annotation {} is empty",
                        annotation.kind(),
                        annotation.id()
                    )));
                }
                let has_block = node
                    .children
                    .iter()
                    .any(|c| self.nodes.get(c).is_some_and(|n| !n.kind.is_inline()));
                if has_block {
                    return Err(DocModelError::TreeStructureError(format!(
                        "{} annotation {} contains a block",
                        annotation.kind(),
                        annotation.id()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}
