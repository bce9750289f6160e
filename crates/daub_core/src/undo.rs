//! Linear undo history
//!
//! Holds committed strokes plus a cursor separating active from undone
//! entries. Reversal is by replay: callers redraw all strokes in
//! [`UndoStore::active`] against a clean background instead of applying
//! inverse operations. Undo/redo past the history bounds are no-ops.

use crate::Stroke;

/// Ordered stroke history with a redo cursor. No branching: recording a new
/// stroke after an undo discards the undone tail.
#[derive(Clone, Debug, Default)]
pub struct UndoStore {
    strokes: Vec<Stroke>,
    cursor: usize,
}

impl UndoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed stroke, discarding any redo tail.
    pub fn record(&mut self, stroke: Stroke) {
        self.strokes.truncate(self.cursor);
        self.strokes.push(stroke);
        self.cursor = self.strokes.len();
    }

    /// Step the cursor back one stroke. Returns `false` at the lower bound.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Re-advance the cursor over the most recently undone stroke.
    /// Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        if self.cursor == self.strokes.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.strokes.len()
    }

    /// Strokes up to the cursor, in commit order, for full-repaint replay.
    pub fn active(&self) -> &[Stroke] {
        &self.strokes[..self.cursor]
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.cursor = 0;
    }
}
