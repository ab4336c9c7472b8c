//! Manifest read-modify-write cycle.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::remote_cursor::RemoteCursor;
use crate::domain::entities::{Manifest, RemoteLayout, TransferMode};
use crate::domain::errors::SyncError;
use crate::domain::ports::FetcherPort;

/// Updated manifest written locally but not yet uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedManifest {
    pub manifest: Manifest,
    pub local_path: PathBuf,
}

/// Fetches, updates and re-uploads the gallery manifest.
#[derive(Clone)]
pub struct ManifestSynchronizer {
    fetcher: Arc<dyn FetcherPort>,
    manifest_url: String,
    local_path: PathBuf,
    layout: RemoteLayout,
}

impl ManifestSynchronizer {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn FetcherPort>,
        manifest_url: impl Into<String>,
        local_path: impl Into<PathBuf>,
        layout: RemoteLayout,
    ) -> Self {
        Self {
            fetcher,
            manifest_url: manifest_url.into(),
            local_path: local_path.into(),
            layout,
        }
    }

    /// Fetches the remote manifest, records `filename` and writes the result locally.
    ///
    /// # Errors
    /// Returns `SyncError::Parse` for a malformed manifest; other variants for
    /// fetch and disk failures.
    pub async fn prepare(&self, filename: &str) -> Result<PreparedManifest, SyncError> {
        self.fetcher
            .fetch(&self.manifest_url, &self.local_path)
            .await?;

        let raw = tokio::fs::read_to_string(&self.local_path).await?;
        let mut manifest = Manifest::from_json(&raw).map_err(SyncError::Parse)?;

        if !manifest.is_consistent() {
            warn!(
                image_count = manifest.image_count,
                posts = manifest.posts.len(),
                "Manifest count does not match its post list"
            );
        }

        manifest.record(filename);
        let json = manifest.to_json().map_err(SyncError::Serialize)?;

        let path = self.local_path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, json.as_bytes()))
            .await
            .map_err(std::io::Error::other)??;

        debug!(
            image_count = manifest.image_count,
            latest = ?manifest.latest(),
            "Manifest updated locally"
        );

        Ok(PreparedManifest {
            manifest,
            local_path: self.local_path.clone(),
        })
    }

    /// Uploads a prepared manifest in text mode into the manifest directory.
    ///
    /// # Errors
    /// Returns `SyncError::Transfer` if any remote command fails.
    pub async fn commit(
        &self,
        cursor: &mut RemoteCursor<'_>,
        prepared: &PreparedManifest,
    ) -> Result<(), SyncError> {
        cursor.session().set_mode(TransferMode::Ascii).await?;
        cursor.goto(&self.layout.manifest_path()).await?;
        cursor
            .session()
            .put(&prepared.local_path, &self.layout.manifest_name)
            .await?;

        info!(
            image_count = prepared.manifest.image_count,
            "Manifest uploaded"
        );
        Ok(())
    }

    /// Runs [`prepare`](Self::prepare) then [`commit`](Self::commit).
    ///
    /// # Errors
    /// Returns the first failing step's error.
    pub async fn publish_entry(
        &self,
        cursor: &mut RemoteCursor<'_>,
        filename: &str,
    ) -> Result<Manifest, SyncError> {
        let prepared = self.prepare(filename).await?;
        self.commit(cursor, &prepared).await?;
        Ok(prepared.manifest)
    }

    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{MockFetcher, MockTransferSession};
    use tempfile::tempdir;

    const URL: &str = "https://gallery.test/database.json";

    fn synchronizer(fetcher: &MockFetcher, dir: &Path) -> ManifestSynchronizer {
        ManifestSynchronizer::new(
            Arc::new(fetcher.clone()),
            URL,
            dir.join("database.json"),
            RemoteLayout::default(),
        )
    }

    #[tokio::test]
    async fn test_prepare_increments_and_prepends() {
        let dir = tempdir().unwrap();
        let fetcher =
            MockFetcher::new().with_body(URL, r#"{"imageCount":1,"posts":["old.png"]}"#);
        let sync = synchronizer(&fetcher, dir.path());

        let prepared = sync.prepare("cat.png").await.unwrap();

        assert_eq!(prepared.manifest.image_count, 2);
        assert_eq!(prepared.manifest.posts, vec!["cat.png", "old.png"]);

        let on_disk = std::fs::read_to_string(dir.path().join("database.json")).unwrap();
        assert_eq!(Manifest::from_json(&on_disk).unwrap(), prepared.manifest);
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_parse_error() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new().with_body(URL, "<html>502 Bad Gateway</html>");
        let sync = synchronizer(&fetcher, dir.path());

        let err = sync.prepare("cat.png").await.unwrap_err();
        assert!(err.is_parse_error());
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let dir = tempdir().unwrap();
        let sync = synchronizer(&MockFetcher::new(), dir.path());

        let err = sync.prepare("cat.png").await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_publish_entry_uploads_in_ascii_mode() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new().with_body(URL, r#"{"imageCount":0,"posts":[]}"#);
        let sync = synchronizer(&fetcher, dir.path());
        let remote = MockTransferSession::with_dirs(&["subdomain-sinon"]);
        let mut session = remote.clone();
        let mut cursor = RemoteCursor::begin(&mut session).await.unwrap();

        let manifest = sync.publish_entry(&mut cursor, "cat.png").await.unwrap();
        cursor.restore().await.unwrap();

        assert_eq!(manifest.image_count, 1);
        let log = remote.log();
        assert_eq!(&log[1..4], &["TYPE ascii", "CWD subdomain-sinon", "STOR database.json"]);
        let uploaded = remote.file("/subdomain-sinon/database.json").unwrap();
        let uploaded = Manifest::from_json(std::str::from_utf8(&uploaded).unwrap()).unwrap();
        assert_eq!(uploaded.posts, vec!["cat.png"]);
    }

    #[tokio::test]
    async fn test_sequential_entries_stay_consistent() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new().with_body(URL, r#"{"imageCount":0,"posts":[]}"#);
        let sync = synchronizer(&fetcher, dir.path());
        let remote = MockTransferSession::with_dirs(&["subdomain-sinon"]);

        for i in 0..5 {
            let mut session = remote.clone();
            let mut cursor = RemoteCursor::begin(&mut session).await.unwrap();
            sync.publish_entry(&mut cursor, &format!("img{i}.png"))
                .await
                .unwrap();
            cursor.restore().await.unwrap();

            // The next fetch serves what was just uploaded.
            let current = remote.file("/subdomain-sinon/database.json").unwrap();
            fetcher.set_body(URL, current);
        }

        let body = remote.file("/subdomain-sinon/database.json").unwrap();
        let manifest = Manifest::from_json(std::str::from_utf8(&body).unwrap()).unwrap();
        assert_eq!(manifest.image_count, 5);
        assert_eq!(
            manifest.posts,
            vec!["img4.png", "img3.png", "img2.png", "img1.png", "img0.png"]
        );
    }
}
