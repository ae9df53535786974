use std::path::PathBuf;

/// Resolves where the files of the chapter being narrated live.
pub trait StorageRuntime: Send + Sync + 'static {
    fn chapter_dir(&self) -> Result<PathBuf, crate::Error>;
}

impl StorageRuntime for PathBuf {
    fn chapter_dir(&self) -> Result<PathBuf, crate::Error> {
        Ok(self.clone())
    }
}
