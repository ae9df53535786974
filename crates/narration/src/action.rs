use crate::{Error, Result, VerseIndex, VerseNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Pending,
    Executed,
    Undone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Opens a new verse at the current end of the recording.
    AppendVerse,
    /// Points a verse at a fresh recording starting at the current end.
    ReRecordVerse { index: usize },
    MoveMarker {
        first: usize,
        second: usize,
        boundary: u32,
    },
    EditVerse { index: usize, start: u32, end: u32 },
    ResetAll,
    BulkReplace { nodes: Vec<VerseNode> },
}

/// The list region an executed action touched: `inserted` currently sits at
/// `at`, `removed` is what was there before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub at: usize,
    pub removed: Vec<VerseNode>,
    pub inserted: Vec<VerseNode>,
}

/// A reversible structural change to a [`VerseIndex`]. Recorded audio is
/// never touched; undo and redo only swap index entries.
#[derive(Debug, Clone)]
pub struct NarrationAction {
    kind: ActionKind,
    state: ActionState,
    edit: Option<Edit>,
}

impl NarrationAction {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            state: ActionState::Pending,
            edit: None,
        }
    }

    pub fn append_verse() -> Self {
        Self::new(ActionKind::AppendVerse)
    }

    pub fn re_record_verse(index: usize) -> Self {
        Self::new(ActionKind::ReRecordVerse { index })
    }

    pub fn move_marker(first: usize, second: usize, boundary: u32) -> Self {
        Self::new(ActionKind::MoveMarker {
            first,
            second,
            boundary,
        })
    }

    pub fn edit_verse(index: usize, start: u32, end: u32) -> Self {
        Self::new(ActionKind::EditVerse { index, start, end })
    }

    pub fn reset_all() -> Self {
        Self::new(ActionKind::ResetAll)
    }

    pub fn bulk_replace(nodes: Vec<VerseNode>) -> Self {
        Self::new(ActionKind::BulkReplace { nodes })
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn edit(&self) -> Option<&Edit> {
        self.edit.as_ref()
    }

    pub fn execute(&mut self, index: &mut VerseIndex, total_frames: u32) -> Result<()> {
        self.expect_state(ActionState::Pending)?;

        let (at, inserted) = self.plan(index, total_frames)?;
        let removed_count = match &self.kind {
            ActionKind::AppendVerse => 0,
            ActionKind::ReRecordVerse { .. } | ActionKind::EditVerse { .. } => 1,
            ActionKind::MoveMarker { .. } => 2,
            ActionKind::ResetAll | ActionKind::BulkReplace { .. } => index.len(),
        };
        let removed = index.splice(at, removed_count, inserted.clone())?;

        self.edit = Some(Edit {
            at,
            removed,
            inserted,
        });
        self.state = ActionState::Executed;
        Ok(())
    }

    /// Restores what the action replaced. The region's current contents are
    /// captured first so later in-place changes (a verse being finalized)
    /// come back on redo.
    pub fn undo(&mut self, index: &mut VerseIndex) -> Result<()> {
        self.expect_state(ActionState::Executed)?;
        let edit = self.edit_mut()?;

        let current = index.splice(edit.at, edit.inserted.len(), edit.removed.clone())?;
        edit.inserted = current;
        self.state = ActionState::Undone;
        Ok(())
    }

    pub fn redo(&mut self, index: &mut VerseIndex) -> Result<()> {
        self.expect_state(ActionState::Undone)?;
        let edit = self.edit_mut()?;

        let current = index.splice(edit.at, edit.removed.len(), edit.inserted.clone())?;
        edit.removed = current;
        self.state = ActionState::Executed;
        Ok(())
    }

    /// Where the action applies and what it puts there.
    fn plan(&self, index: &VerseIndex, total_frames: u32) -> Result<(usize, Vec<VerseNode>)> {
        let plan = match &self.kind {
            ActionKind::AppendVerse => (index.len(), vec![VerseNode::open_at(total_frames)]),
            ActionKind::ReRecordVerse { index: verse } => {
                ensure_exists(index, *verse)?;
                (*verse, vec![VerseNode::open_at(total_frames)])
            }
            ActionKind::MoveMarker {
                first,
                second,
                boundary,
            } => {
                let (left, right) = index.moved_pair(*first, *second, *boundary)?;
                (*first, vec![left, right])
            }
            ActionKind::EditVerse {
                index: verse,
                start,
                end,
            } => {
                ensure_exists(index, *verse)?;
                (*verse, vec![VerseNode::new(*start, *end)])
            }
            ActionKind::ResetAll => (0, Vec::new()),
            ActionKind::BulkReplace { nodes } => (0, nodes.clone()),
        };
        Ok(plan)
    }

    fn expect_state(&self, expected: ActionState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidActionState(self.state));
        }
        Ok(())
    }

    fn edit_mut(&mut self) -> Result<&mut Edit> {
        let state = self.state;
        self.edit.as_mut().ok_or(Error::InvalidActionState(state))
    }
}

fn ensure_exists(index: &VerseIndex, verse: usize) -> Result<()> {
    if verse >= index.len() {
        return Err(Error::IndexOutOfRange {
            index: verse,
            len: index.len(),
        });
    }
    Ok(())
}
