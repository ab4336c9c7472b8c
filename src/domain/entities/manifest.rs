//! Gallery manifest document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persisted record of every published image, newest first.
///
/// Serialized as `{ "imageCount": n, "posts": [...] }`. Fields the gallery site
/// adds on its own are kept in `extra` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Number of successful publications ever recorded.
    pub image_count: u64,
    /// Published filenames, newest first.
    #[serde(default)]
    pub posts: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Manifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a manifest from its JSON text.
    ///
    /// # Errors
    /// Returns error if the document is not a well-formed manifest.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the manifest to compact JSON.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Records one publication.
    pub fn record(&mut self, filename: impl Into<String>) {
        self.image_count = self.image_count.saturating_add(1);
        self.posts.insert(0, filename.into());
    }

    /// Returns the most recently published filename.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.posts.first().map(String::as_str)
    }

    /// Returns whether `posts` has exactly `imageCount` entries.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        u64::try_from(self.posts.len()).is_ok_and(|len| len == self.image_count)
    }
}
