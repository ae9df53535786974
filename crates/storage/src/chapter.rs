use std::path::{Path, PathBuf};

pub const WORKING_AUDIO_FILENAME: &str = "narration.pcm";
pub const VERSES_FILENAME: &str = "narration_verses.json";
pub const EMPTY_VERSES: &str = "[]";

const SCRATCH_PREFIX: &str = "new_";

/// Per-chapter directory under a project's audio directory, named by the
/// chapter number.
pub fn compute_chapter_dir(project_audio_dir: &Path, chapter: u32) -> PathBuf {
    project_audio_dir.join(chapter.to_string())
}

pub fn compute_working_audio_path(chapter_dir: &Path, file_name: &str) -> PathBuf {
    chapter_dir.join(file_name)
}

pub fn compute_verses_path(chapter_dir: &Path, file_name: &str) -> PathBuf {
    chapter_dir.join(file_name)
}

/// Sibling path used while a file is rebuilt before being swapped in.
pub fn compute_scratch_path(target: &Path) -> Option<PathBuf> {
    let name = target.file_name()?.to_str()?;
    Some(target.with_file_name(format!("{SCRATCH_PREFIX}{name}")))
}

pub fn validate_chapter_dir(path: &Path) -> Result<(), crate::Error> {
    if !path.is_absolute() {
        return Err(crate::Error::PathNotAbsolute);
    }

    if path.to_str().is_none() {
        return Err(crate::Error::PathNotValidUtf8);
    }

    if path.exists() && !path.is_dir() {
        return Err(crate::Error::PathIsNotDirectory);
    }

    Ok(())
}

pub fn ensure_chapter_dir(path: &Path) -> Result<(), crate::Error> {
    validate_chapter_dir(path)?;

    if !path.exists() {
        std::fs::create_dir_all(path)?;
        tracing::debug!(path = %path.display(), "chapter_dir_created");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    mod validate_chapter_dir_tests {
        use super::*;

        #[test]
        fn accepts_missing_absolute_path() {
            let temp = tempdir().unwrap();
            assert!(validate_chapter_dir(&temp.path().join("3")).is_ok());
        }

        #[test]
        fn rejects_relative_path() {
            let result = validate_chapter_dir(Path::new("gen/3"));
            assert!(matches!(result, Err(crate::Error::PathNotAbsolute)));
        }

        #[test]
        fn rejects_file_in_place_of_directory() {
            let temp = tempdir().unwrap();
            let path = temp.path().join("3");
            fs::write(&path, "not a dir").unwrap();

            let result = validate_chapter_dir(&path);
            assert!(matches!(result, Err(crate::Error::PathIsNotDirectory)));
        }

        #[cfg(unix)]
        #[test]
        fn rejects_non_utf8_path() {
            use std::ffi::OsStr;
            use std::os::unix::ffi::OsStrExt;

            let temp = tempdir().unwrap();
            let path = temp.path().join(OsStr::from_bytes(&[0x66, 0xff, 0x6f]));

            let result = validate_chapter_dir(&path);
            assert!(matches!(result, Err(crate::Error::PathNotValidUtf8)));
        }
    }

    mod ensure_chapter_dir_tests {
        use super::*;

        #[test]
        fn creates_nested_directories() {
            let temp = tempdir().unwrap();
            let path = compute_chapter_dir(&temp.path().join("gen"), 3);

            ensure_chapter_dir(&path).unwrap();

            assert!(path.is_dir());
            assert!(path.ends_with("gen/3"));
        }

        #[test]
        fn existing_directory_is_left_alone() {
            let temp = tempdir().unwrap();
            fs::write(temp.path().join("keep.txt"), "x").unwrap();

            ensure_chapter_dir(temp.path()).unwrap();

            assert!(temp.path().join("keep.txt").exists());
        }
    }

    #[test]
    fn chapter_files_live_in_chapter_dir() {
        let dir = Path::new("/projects/gen/3");

        assert_eq!(
            compute_working_audio_path(dir, WORKING_AUDIO_FILENAME),
            PathBuf::from("/projects/gen/3/narration.pcm")
        );
        assert_eq!(
            compute_verses_path(dir, VERSES_FILENAME),
            PathBuf::from("/projects/gen/3/narration_verses.json")
        );
    }

    #[test]
    fn scratch_path_is_a_prefixed_sibling() {
        assert_eq!(
            compute_scratch_path(Path::new("/projects/gen/3/narration.pcm")),
            Some(PathBuf::from("/projects/gen/3/new_narration.pcm"))
        );
        assert_eq!(compute_scratch_path(Path::new("/")), None);
    }
}
