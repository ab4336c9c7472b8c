//! Local cache directory management.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::CacheError;

/// Local directories used during a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheLayout {
    /// Downloaded originals.
    pub download_dir: PathBuf,
    /// Generated previews.
    pub preview_dir: PathBuf,
    /// Local copy of the manifest.
    pub manifest_path: PathBuf,
}

impl CacheLayout {
    #[must_use]
    pub fn download_path(&self, filename: &str) -> PathBuf {
        self.download_dir.join(filename)
    }

    /// Directories that must exist before any fetch.
    #[must_use]
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.download_dir.clone(), self.preview_dir.clone()];
        if let Some(parent) = self.manifest_path.parent()
            && !parent.as_os_str().is_empty()
        {
            dirs.push(parent.to_path_buf());
        }
        dirs
    }

    /// Creates every cache directory that does not exist yet.
    ///
    /// # Errors
    /// Returns `CacheError` if a directory cannot be created.
    pub fn ensure(&self) -> Result<(), CacheError> {
        ensure_directories(&self.directories())
    }
}

impl Default for CacheLayout {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("image_downloads"),
            preview_dir: PathBuf::from("image_previews"),
            manifest_path: PathBuf::from("database.json"),
        }
    }
}

/// Ensures every path exists as a directory. Existing directories are left alone.
///
/// # Errors
/// Returns `CacheError` if a path cannot be created or is a regular file.
pub fn ensure_directories<P: AsRef<Path>>(paths: &[P]) -> Result<(), CacheError> {
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            debug!(path = %path.display(), "Cache directory present");
            continue;
        }
        if path.exists() {
            return Err(CacheError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        info!(path = %path.display(), "Creating cache directory");
        fs::create_dir_all(path).map_err(|e| CacheError::directory_creation(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let downloads = dir.path().join("image_downloads");
        let previews = dir.path().join("image_previews");

        ensure_directories(&[&downloads, &previews]).unwrap();

        assert!(downloads.is_dir());
        assert!(previews.is_dir());
    }

    #[test]
    fn test_twice_is_idempotent_and_keeps_contents() {
        let dir = tempdir().unwrap();
        let downloads = dir.path().join("image_downloads");
        ensure_directories(&[&downloads]).unwrap();
        fs::write(downloads.join("cat.png"), b"meow").unwrap();

        ensure_directories(&[&downloads]).unwrap();
        ensure_directories(&[&downloads]).unwrap();

        assert_eq!(fs::read(downloads.join("cat.png")).unwrap(), b"meow");
    }

    #[test]
    fn test_file_in_the_way_is_an_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("image_previews");
        fs::write(&blocker, b"").unwrap();

        let err = ensure_directories(&[&blocker]).unwrap_err();
        assert!(matches!(err, CacheError::NotADirectory { .. }));
    }

    #[test]
    fn test_layout_includes_manifest_parent() {
        let layout = CacheLayout {
            manifest_path: PathBuf::from("state/database.json"),
            ..CacheLayout::default()
        };
        assert_eq!(layout.directories().len(), 3);
        assert_eq!(CacheLayout::default().directories().len(), 2);
    }
}
