use crate::{NarrationAction, Result, VerseIndex};

/// Undo and redo stacks of executed actions.
#[derive(Debug, Default)]
pub struct NarrationHistory {
    undo: Vec<NarrationAction>,
    redo: Vec<NarrationAction>,
}

impl NarrationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` and records it. Any redo branch is dropped.
    pub fn execute(
        &mut self,
        mut action: NarrationAction,
        index: &mut VerseIndex,
        total_frames: u32,
    ) -> Result<()> {
        action.execute(index, total_frames)?;
        self.undo.push(action);
        self.redo.clear();
        Ok(())
    }

    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self, index: &mut VerseIndex) -> Result<bool> {
        let Some(mut action) = self.undo.pop() else {
            return Ok(false);
        };
        if let Err(error) = action.undo(index) {
            self.undo.push(action);
            return Err(error);
        }
        self.redo.push(action);
        Ok(true)
    }

    /// Returns `false` when there was nothing to redo.
    pub fn redo(&mut self, index: &mut VerseIndex) -> Result<bool> {
        let Some(mut action) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(error) = action.redo(index) {
            self.redo.push(action);
            return Err(error);
        }
        self.undo.push(action);
        Ok(true)
    }

    pub fn has_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn has_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
