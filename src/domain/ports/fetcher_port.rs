//! Remote fetch port definition.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::FetchError;

/// A remote resource fully written to local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Local path of the downloaded file.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
}

/// Port for downloading remote resources to disk.
#[async_trait]
pub trait FetcherPort: Send + Sync {
    /// Downloads `url` into `dest`.
    ///
    /// Returns only after the local file is flushed and closed.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedFile, FetchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use parking_lot::Mutex;

    /// Serves canned bodies keyed by URL.
    #[derive(Clone, Default)]
    pub struct MockFetcher {
        bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serves `body` for `url`.
        pub fn with_body(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.set_body(url, body);
            self
        }

        pub fn set_body(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.bodies.lock().insert(url.to_string(), body.into());
        }

        /// URLs requested so far, in order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl FetcherPort for MockFetcher {
        async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedFile, FetchError> {
            self.calls.lock().push(url.to_string());
            let body = self
                .bodies
                .lock()
                .get(url)
                .cloned()
                .ok_or(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })?;

            tokio::fs::write(dest, &body).await?;
            Ok(FetchedFile {
                path: dest.to_path_buf(),
                bytes: body.len() as u64,
            })
        }
    }
}
