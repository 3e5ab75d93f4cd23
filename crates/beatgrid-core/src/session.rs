//! Editing session: current pattern plus its history

use tracing::info;

use crate::error::Result;
use crate::history::HistoryManager;
use crate::note::NoteStore;
use crate::transform::TransformChain;

/// Owns the working note store and the history of committed edits.
#[derive(Debug, Clone)]
pub struct EditSession {
    current: NoteStore,
    history: HistoryManager,
}

impl EditSession {
    /// Start a session; the initial store becomes the first history entry.
    pub fn new(store: NoteStore, max_history: usize) -> Result<Self> {
        let mut history = HistoryManager::new(max_history)?;
        history.push(&store, "Initial state");
        Ok(Self { current: store, history })
    }

    pub fn current(&self) -> &NoteStore {
        &self.current
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Run `edit` on the current store and commit the result.
    ///
    /// On error nothing is committed and the current store is unchanged.
    pub fn apply<F>(&mut self, description: &str, edit: F) -> Result<&NoteStore>
    where
        F: FnOnce(&NoteStore) -> Result<NoteStore>,
    {
        let next = edit(&self.current)?;
        self.history.push(&next, description);
        self.current = next;
        info!(edit = description, notes = self.current.len(), "Applied edit");
        Ok(&self.current)
    }

    /// Apply a whole transform chain as one undoable step.
    pub fn apply_chain(&mut self, chain: &TransformChain) -> Result<&NoteStore> {
        let description = chain.description();
        self.apply(&description, |store| chain.apply(store))
    }

    /// Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            return false;
        };
        self.current = entry.note_store.clone();
        true
    }

    /// Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            return false;
        };
        self.current = entry.note_store.clone();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}
