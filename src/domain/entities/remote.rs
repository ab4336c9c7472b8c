//! Remote gallery layout on the transfer server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transfer representation for a remote upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Text mode, used for the manifest.
    Ascii,
    /// Binary mode, used for images.
    Binary,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascii => f.write_str("ascii"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// Directory layout relative to the session root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLayout {
    /// Directory holding the manifest.
    pub site_dir: String,
    /// Gallery directory relative to `site_dir`.
    pub gallery_dir: String,
    /// Preview directory relative to the gallery directory.
    pub preview_dir: String,
    /// Manifest filename inside `site_dir`.
    pub manifest_name: String,
}

impl RemoteLayout {
    /// Path of the manifest directory relative to the root.
    #[must_use]
    pub fn manifest_path(&self) -> String {
        clean_join(&[&self.site_dir])
    }

    /// Path of the gallery directory relative to the root.
    #[must_use]
    pub fn gallery_path(&self) -> String {
        clean_join(&[&self.site_dir, &self.gallery_dir])
    }

    /// Path of the preview directory relative to the root.
    #[must_use]
    pub fn preview_path(&self) -> String {
        clean_join(&[&self.site_dir, &self.gallery_dir, &self.preview_dir])
    }
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            site_dir: "subdomain-sinon".to_string(),
            gallery_dir: "images/gallery".to_string(),
            preview_dir: "preview".to_string(),
            manifest_name: "database.json".to_string(),
        }
    }
}

/// Splits a relative remote path into its non-empty segments.
#[must_use]
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect()
}

fn clean_join(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| path_segments(part))
        .collect::<Vec<_>>()
        .join("/")
}
