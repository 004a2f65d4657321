//! Scratch file management
//!
//! Intermediate files (extracted WebVTT subtitles) live next to their final
//! output and are removed once the guard is dropped.

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Guard for an intermediate file that is deleted on drop
#[derive(Debug)]
pub(crate) struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserves a unique hidden path inside `dir`
    ///
    /// The name is `.<stem>.<ulid>.<extension>`. The file itself is not
    /// created; whatever tool writes to the path owns its creation, and the
    /// guard removes it afterwards if it exists.
    pub(crate) fn reserve(dir: &Path, stem: &str, extension: &str) -> Self {
        let ulid = ulid::Ulid::new();
        let path = dir.join(format!(".{}.{}.{}", stem, ulid, extension));
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // Silently ignore errors during cleanup
        let _ = fs::remove_file(&self.path);
    }
}

impl Deref for ScratchFile {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reserve_does_not_create() {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchFile::reserve(temp.path(), "S01E01_One", "vtt");

        assert!(!scratch.exists());
        assert_eq!(scratch.parent(), Some(temp.path()));

        let name = scratch.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".S01E01_One."));
        assert!(name.ends_with(".vtt"));
    }

    #[test]
    fn test_cleanup_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = {
            let scratch = ScratchFile::reserve(temp.path(), "episode", "vtt");
            fs::write(scratch.path(), "WEBVTT").unwrap();
            assert!(scratch.exists());
            scratch.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn test_unique_paths() {
        let temp = TempDir::new().unwrap();
        let first = ScratchFile::reserve(temp.path(), "episode", "vtt");
        let second = ScratchFile::reserve(temp.path(), "episode", "vtt");
        assert_ne!(first.path(), second.path());
    }
}
