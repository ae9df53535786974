use crate::ActionState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Container(#[from] narration_audio::Error),
    #[error(transparent)]
    Storage(#[from] narration_storage::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("verse {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("verses {first} and {second} are not adjacent")]
    InvalidAdjacency { first: usize, second: usize },
    #[error("action cannot run while {0:?}")]
    InvalidActionState(ActionState),
    #[error("background task failed: {0}")]
    TaskJoin(String),
}
