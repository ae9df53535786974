use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

pub fn atomic_write(target: &Path, content: &str) -> std::io::Result<()> {
    let parent = parent_of(target)?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    std::fs::write(temp.path(), content)?;
    temp.persist(target)?;
    Ok(())
}

pub async fn atomic_write_async(target: &Path, content: &str) -> std::io::Result<()> {
    let parent = parent_of(target)?;
    tokio::fs::create_dir_all(parent).await?;

    let temp = NamedTempFile::new_in(parent)?;
    tokio::fs::write(temp.path(), content).await?;
    temp.persist(target)?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(target: &Path, value: &T) -> crate::Result<()> {
    let content = serde_json::to_string(value)?;
    atomic_write(target, &content)?;
    Ok(())
}

pub async fn write_json_async<T: Serialize + ?Sized>(target: &Path, value: &T) -> crate::Result<()> {
    let content = serde_json::to_string(value)?;
    atomic_write_async(target, &content).await?;
    Ok(())
}

pub async fn read_json_async<T: DeserializeOwned>(target: &Path) -> crate::Result<T> {
    let content = tokio::fs::read_to_string(target).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes `initial` to `target` unless the file already exists. Returns
/// whether the file was created.
pub fn ensure_file(target: &Path, initial: &str) -> std::io::Result<bool> {
    if target.exists() {
        return Ok(false);
    }
    atomic_write(target, initial)?;
    tracing::debug!(path = %target.display(), "file_bootstrapped");
    Ok(true)
}

fn parent_of(target: &Path) -> std::io::Result<&Path> {
    target.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "target has no parent")
    })
}
