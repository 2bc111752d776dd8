//! Fixed-depth undo ring

use super::mode::Mode;
use super::model::SketchModel;

/// Number of snapshots kept; older ones are silently overwritten.
pub const UNDO_CAPACITY: usize = 10;

/// Model + mode as they were before a mutating command.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoSnapshot {
    pub model: SketchModel,
    pub mode: Mode,
}

/// Ring buffer of snapshots. Undo is destructive: there is no redo.
#[derive(Debug, Clone)]
pub struct UndoRing {
    slots: Vec<Option<UndoSnapshot>>,
    count: usize,
}

impl Default for UndoRing {
    fn default() -> Self {
        Self {
            slots: vec![None; UNDO_CAPACITY],
            count: 0,
        }
    }
}

impl UndoRing {
    /// Store a snapshot in slot `count % capacity`.
    pub fn save(&mut self, snapshot: UndoSnapshot) {
        let slot = self.count % UNDO_CAPACITY;
        self.slots[slot] = Some(snapshot);
        self.count += 1;
    }

    /// Take the most recent snapshot, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<UndoSnapshot> {
        let latest = self.count.checked_sub(1)?;
        let snapshot = self.slots[latest % UNDO_CAPACITY].take()?;
        self.count = latest;
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        self.count
            .checked_sub(1)
            .is_some_and(|latest| self.slots[latest % UNDO_CAPACITY].is_some())
    }

    /// Snapshots currently held
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
