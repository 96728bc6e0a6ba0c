//! Selection model - caret position and range selection

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// A position in the document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// The node containing this position (usually a text node)
    pub node_id: NodeId,
    /// Character offset within the node
    pub offset: usize,
}

impl Position {
    /// Create a new position
    pub fn new(node_id: NodeId, offset: usize) -> Self {
        Self { node_id, offset }
    }

    /// Create a position at the start of a node
    pub fn start_of(node_id: NodeId) -> Self {
        Self { node_id, offset: 0 }
    }
}

/// A range selection in the document
///
/// A selection has an anchor (where the selection started) and a focus
/// (where the selection ends / where the caret is). When anchor == focus,
/// the selection is collapsed (just a caret).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Where the selection started
    pub anchor: Position,
    /// Where the selection ends (caret position)
    pub focus: Position,
}

impl Selection {
    /// Create a new selection
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    /// Create a collapsed selection (caret only)
    pub fn collapsed(position: Position) -> Self {
        Self {
            anchor: position,
            focus: position,
        }
    }

    /// Select `[start, end)` inside a single node
    pub fn within(node_id: NodeId, start: usize, end: usize) -> Self {
        Self::new(Position::new(node_id, start), Position::new(node_id, end))
    }

    /// Check if this selection is collapsed (just a caret)
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Move the focus, extending the selection
    pub fn extend_to(&self, focus: Position) -> Self {
        Self {
            anchor: self.anchor,
            focus,
        }
    }

    /// Collapse the selection to the focus position
    pub fn collapse_to_focus(&self) -> Self {
        Self::collapsed(self.focus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapsed_selection() {
        let node = NodeId::new();
        let selection = Selection::collapsed(Position::new(node, 3));
        assert!(selection.is_collapsed());
        assert!(!Selection::within(node, 0, 3).is_collapsed());
    }

    #[test]
    fn test_extend_and_collapse() {
        let node = NodeId::new();
        let selection = Selection::collapsed(Position::start_of(node)).extend_to(Position::new(node, 4));
        assert_eq!(selection.anchor.offset, 0);
        assert_eq!(selection.focus.offset, 4);
        assert_eq!(selection.collapse_to_focus().anchor.offset, 4);
    }
}
