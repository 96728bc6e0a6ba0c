//! Undo/redo history with command batching

use crate::{Command, EditError, Result, UndoSettings};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// An entry in the undo history
#[derive(Debug)]
struct UndoEntry {
    command: Box<dyn Command>,
    inverse: Box<dyn Command>,
    timestamp: Instant,
}

/// Undo and redo stacks for one editing session
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: VecDeque<UndoEntry>,
    redo_stack: Vec<Box<dyn Command>>,
    max_entries: usize,
    /// Commands closer together than this may be merged into one entry
    batch_threshold: Duration,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::from_settings(&UndoSettings::default())
    }

    pub fn from_settings(settings: &UndoSettings) -> Self {
        Self::with_limits(
            settings.max_entries,
            Duration::from_millis(settings.batch_threshold_ms),
        )
    }

    pub fn with_limits(max_entries: usize, batch_threshold: Duration) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
            batch_threshold,
        }
    }

    /// Record an executed command and its inverse. Clears the redo stack.
    pub fn push(&mut self, command: Box<dyn Command>, inverse: Box<dyn Command>) {
        self.redo_stack.clear();
        let now = Instant::now();

        if let Some(last) = self.undo_stack.back_mut() {
            if now.duration_since(last.timestamp) < self.batch_threshold {
                if let Some(merged) = last.command.merge_with(command.as_ref()) {
                    // The older inverse still restores the state before the batch
                    last.command = merged;
                    last.timestamp = now;
                    return;
                }
            }
        }

        self.undo_stack.push_back(UndoEntry {
            command,
            inverse,
            timestamp: now,
        });
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.pop_front();
        }
    }

    /// Take the inverse of the last command, moving the command to the redo stack
    pub fn pop_undo(&mut self) -> Result<Box<dyn Command>> {
        let entry = self.undo_stack.pop_back().ok_or(EditError::UndoStackEmpty)?;
        self.redo_stack.push(entry.command);
        Ok(entry.inverse)
    }

    pub fn pop_redo(&mut self) -> Result<Box<dyn Command>> {
        self.redo_stack.pop().ok_or(EditError::RedoStackEmpty)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Display name of the command the next undo reverts
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(|entry| entry.command.display_name())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|command| command.display_name())
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}
