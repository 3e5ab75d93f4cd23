//! Snapshot-based undo/redo history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BeatgridError, Result};
use crate::note::NoteStore;

/// Default maximum number of snapshots kept
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// A committed edit: full copy of the store after the edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub note_store: NoteStore,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Linear undo/redo over note store snapshots.
///
/// Entries form a single line with a cursor on the current one. Pushing
/// after an undo discards everything past the cursor, and the oldest
/// entries fall off once `max_history_size` is exceeded.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    /// `None` while empty
    current_index: Option<usize>,
    max_history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            current_index: None,
            max_history_size: DEFAULT_MAX_HISTORY,
        }
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Result<Self> {
        if max_history_size == 0 {
            return Err(BeatgridError::InvalidHistorySize);
        }
        Ok(Self {
            max_history_size,
            ..Self::default()
        })
    }

    /// Record a snapshot of `note_store` as the new current entry.
    pub fn push(&mut self, note_store: &NoteStore, description: impl Into<String>) {
        let keep = self.current_index.map_or(0, |i| i + 1);
        self.entries.truncate(keep);

        let description = description.into();
        debug!(description = %description, notes = note_store.len(), "History push");
        self.entries.push(HistoryEntry {
            note_store: note_store.clone(),
            description,
            timestamp: Utc::now(),
        });

        if self.entries.len() > self.max_history_size {
            let excess = self.entries.len() - self.max_history_size;
            self.entries.drain(..excess);
            debug!(discarded = excess, "History trimmed");
        }
        self.current_index = Some(self.entries.len() - 1);
    }

    /// Step back one entry. `None` when already at the oldest entry.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        let index = self.current_index.filter(|&i| i > 0)? - 1;
        self.current_index = Some(index);
        self.entries.get(index)
    }

    /// Step forward one entry. `None` when already at the newest entry.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let index = self.current_index.filter(|&i| i + 1 < self.entries.len())? + 1;
        self.current_index = Some(index);
        self.entries.get(index)
    }

    pub fn can_undo(&self) -> bool {
        self.current_index.is_some_and(|i| i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.current_index.is_some_and(|i| i + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.current_index?)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Description of the edit an undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.current().map(|e| e.description.as_str())
    }

    /// Description of the edit a redo would reapply
    pub fn redo_description(&self) -> Option<&str> {
        let next = self.current_index? + 1;
        self.entries.get(next).map(|e| e.description.as_str())
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_index = None;
    }
}
