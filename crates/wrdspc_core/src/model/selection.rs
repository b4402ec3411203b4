//! Transient selection into a document.
//!
//! A selection never owns document data and is never persisted; callers
//! re-validate it with `Document::contains_position` after every mutation.

use crate::model::document::{Document, TextPath};
use crate::model::inline::Affinity;

/// Caret location: text container plus char offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub path: TextPath,
    pub offset: usize,
}

impl Position {
    pub fn new(path: TextPath, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Anchor/focus pair. The anchor is where the selection started.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            anchor: position.clone(),
            focus: position,
        }
    }

    /// Selection spanning `start..end` inside one container.
    pub fn within(path: TextPath, start: usize, end: usize) -> Self {
        Self {
            anchor: Position::new(path.clone(), start),
            focus: Position::new(path, end),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Returns whether both endpoints resolve inside `doc`.
    pub fn is_valid_in(&self, doc: &Document) -> bool {
        doc.contains_position(&self.anchor) && doc.contains_position(&self.focus)
    }

    /// Returns `(start, end)` in document order.
    ///
    /// Returns `None` when either endpoint does not resolve in `doc`.
    pub fn ordered(&self, doc: &Document) -> Option<(Position, Position)> {
        if !self.is_valid_in(doc) {
            return None;
        }
        let anchor_index = doc.flat_index(&self.anchor.path)?;
        let focus_index = doc.flat_index(&self.focus.path)?;
        let anchor_first = (anchor_index, self.anchor.offset) <= (focus_index, self.focus.offset);
        if anchor_first {
            Some((self.anchor.clone(), self.focus.clone()))
        } else {
            Some((self.focus.clone(), self.anchor.clone()))
        }
    }

    /// Side of the anchor whose formatting describes this selection.
    ///
    /// A collapsed caret continues the text before it; a range reads the
    /// first selected character on the anchor's side.
    pub fn anchor_affinity(&self, doc: &Document) -> Affinity {
        if self.is_collapsed() {
            return Affinity::Backward;
        }
        match self.ordered(doc) {
            Some((start, _)) if start == self.anchor => Affinity::Forward,
            Some(_) => Affinity::Backward,
            None => Affinity::Forward,
        }
    }
}
