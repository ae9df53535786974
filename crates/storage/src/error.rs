pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("path must be absolute")]
    PathNotAbsolute,
    #[error("path contains invalid UTF-8")]
    PathNotValidUtf8,
    #[error("path exists but is not a directory")]
    PathIsNotDirectory,
}
