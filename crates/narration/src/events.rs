use crate::VerseNode;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(tag = "type")]
pub enum NarrationEvent {
    #[serde(rename = "state_changed")]
    StateChanged {
        active_verses: Vec<VerseNode>,
        has_undo: bool,
        has_redo: bool,
    },
}
