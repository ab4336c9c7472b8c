//! Image assets and their codec family.

use std::fmt;
use std::path::Path;

/// Image format family, derived from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    /// Portable Network Graphics.
    Png,
    /// JPEG, either `.jpg` or `.jpeg`.
    Jpeg,
}

impl AssetFormat {
    /// Resolves the format from a filename, ignoring case.
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Returns the format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image file to be published, identified by its filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    filename: String,
    format: AssetFormat,
}

impl Asset {
    /// Creates an asset when the filename is a bare name with a supported
    /// extension.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Option<Self> {
        let filename = filename.into();
        if !is_plain_filename(&filename) {
            return None;
        }
        let format = AssetFormat::from_filename(&filename)?;
        Some(Self { filename, format })
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub const fn format(&self) -> AssetFormat {
        self.format
    }
}

/// Returns true when the filename is a bare name without path components.
#[must_use]
pub fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\'])
}
