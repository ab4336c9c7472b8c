//! Publication pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::application::dto::{CommitOrder, PublicationReport, PublicationRequest};
use crate::application::services::{CacheLayout, ManifestSynchronizer, PreparedManifest, RemoteCursor};
use crate::domain::entities::{RemoteLayout, TransferMode};
use crate::domain::errors::{PipelineStage, PublishError};
use crate::domain::ports::{FetcherPort, PreviewPort, TransferSession};

/// Collaborators shared by every publication.
#[derive(Clone)]
pub struct PipelineDeps {
    pub fetcher: Arc<dyn FetcherPort>,
    pub previews: Arc<dyn PreviewPort>,
    pub manifest: ManifestSynchronizer,
    pub layout: RemoteLayout,
    pub cache: CacheLayout,
    pub order: CommitOrder,
}

/// Current stage plus the stages entered by the latest publication.
struct StageTracker {
    current: PipelineStage,
    visited: Vec<PipelineStage>,
}

impl StageTracker {
    const fn new() -> Self {
        Self {
            current: PipelineStage::Idle,
            visited: Vec::new(),
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug!(from = %self.current, to = %stage, "Pipeline transition");
        self.current = stage;
        self.visited.push(stage);
    }
}

/// Runs publications one step at a time over an owned transfer session.
pub struct PublicationPipeline {
    deps: PipelineDeps,
    session: Box<dyn TransferSession>,
    stages: StageTracker,
}

impl PublicationPipeline {
    #[must_use]
    pub fn new(deps: PipelineDeps, session: Box<dyn TransferSession>) -> Self {
        Self {
            deps,
            session,
            stages: StageTracker::new(),
        }
    }

    /// Stage of the publication in progress, `Idle` between publications.
    #[must_use]
    pub const fn stage(&self) -> PipelineStage {
        self.stages.current
    }

    /// Stages entered by the latest publication, in order.
    #[must_use]
    pub fn transitions(&self) -> &[PipelineStage] {
        &self.stages.visited
    }

    /// Publishes one asset: download, manifest sync, uploads, cursor restore.
    ///
    /// Steps never overlap. The first failing step aborts the publication
    /// without rolling back earlier uploads; the session is returned to its
    /// root either way, reconnecting when the connection broke.
    ///
    /// # Errors
    /// Returns `PublishError` naming the stage that failed.
    pub async fn publish(
        &mut self,
        request: &PublicationRequest,
    ) -> Result<PublicationReport, PublishError> {
        let span = info_span!(
            "publication",
            id = %request.id,
            filename = %request.filename()
        );

        self.stages.visited.clear();
        let result = self.run(request).instrument(span).await;
        if self.stages.current != PipelineStage::Idle {
            self.stages.enter(PipelineStage::Idle);
        }
        result
    }

    async fn run(
        &mut self,
        request: &PublicationRequest,
    ) -> Result<PublicationReport, PublishError> {
        let filename = request.filename();
        info!(url = %request.url, "Publishing image");

        self.stages.enter(PipelineStage::FetchingAsset);
        let local_asset = self.deps.cache.download_path(filename);
        let fetched = self
            .deps
            .fetcher
            .fetch(&request.url, &local_asset)
            .await
            .map_err(|e| PublishError::new(PipelineStage::FetchingAsset, e))?;
        self.stages.enter(PipelineStage::Fetched);

        self.stages.enter(PipelineStage::ManifestSync);
        let prepared = self
            .deps
            .manifest
            .prepare(filename)
            .await
            .map_err(|e| PublishError::new(PipelineStage::ManifestSync, e))?;
        self.stages.enter(PipelineStage::ManifestUpdated);

        let first_remote_stage = match self.deps.order {
            CommitOrder::ManifestFirst => PipelineStage::UploadingManifest,
            CommitOrder::ManifestLast => PipelineStage::UploadingAsset,
        };

        let (uploaded, restored) = {
            let Self {
                deps,
                session,
                stages,
            } = &mut *self;

            match RemoteCursor::begin(session.as_mut()).await {
                Ok(mut cursor) => {
                    let uploaded =
                        upload(deps, &mut cursor, stages, &prepared, &local_asset, filename).await;
                    stages.enter(PipelineStage::RestoreCursor);
                    (uploaded, cursor.restore().await)
                }
                Err(e) => (Err(PublishError::new(first_remote_stage, e)), Ok(())),
            }
        };

        let connection_lost = uploaded
            .as_ref()
            .err()
            .is_some_and(PublishError::needs_session_reset);
        if let Err(e) = &restored {
            warn!(error = %e, "Could not restore remote cursor, resetting session");
        } else if connection_lost {
            warn!("Transfer connection lost, resetting session");
        }
        if restored.is_err() || connection_lost {
            match self.session.reset().await {
                Ok(()) => info!("Transfer session reset"),
                Err(e) => error!(error = %e, "Transfer session reset failed"),
            }
        }

        let preview_path = uploaded?;

        info!(
            image_count = prepared.manifest.image_count,
            bytes = fetched.bytes,
            "Publication complete"
        );

        Ok(PublicationReport {
            filename: filename.to_string(),
            image_count: prepared.manifest.image_count,
            asset_bytes: fetched.bytes,
            preview_path,
        })
    }

    /// Ends the transfer session.
    pub async fn close(&mut self) {
        match self.session.quit().await {
            Ok(()) => info!("Transfer session closed"),
            Err(e) => warn!(error = %e, "Transfer session did not close cleanly"),
        }
    }
}

async fn upload(
    deps: &PipelineDeps,
    cursor: &mut RemoteCursor<'_>,
    stages: &mut StageTracker,
    prepared: &PreparedManifest,
    local_asset: &Path,
    filename: &str,
) -> Result<PathBuf, PublishError> {
    match deps.order {
        CommitOrder::ManifestFirst => {
            upload_manifest(deps, cursor, stages, prepared).await?;
            upload_asset(deps, cursor, stages, local_asset, filename).await?;
            upload_preview(deps, cursor, stages, local_asset, filename).await
        }
        CommitOrder::ManifestLast => {
            upload_asset(deps, cursor, stages, local_asset, filename).await?;
            let preview = upload_preview(deps, cursor, stages, local_asset, filename).await?;
            upload_manifest(deps, cursor, stages, prepared).await?;
            Ok(preview)
        }
    }
}

async fn upload_manifest(
    deps: &PipelineDeps,
    cursor: &mut RemoteCursor<'_>,
    stages: &mut StageTracker,
    prepared: &PreparedManifest,
) -> Result<(), PublishError> {
    stages.enter(PipelineStage::UploadingManifest);
    deps.manifest
        .commit(cursor, prepared)
        .await
        .map_err(|e| PublishError::new(PipelineStage::UploadingManifest, e))?;
    stages.enter(PipelineStage::ManifestUploaded);
    Ok(())
}

async fn upload_asset(
    deps: &PipelineDeps,
    cursor: &mut RemoteCursor<'_>,
    stages: &mut StageTracker,
    local_asset: &Path,
    filename: &str,
) -> Result<(), PublishError> {
    stages.enter(PipelineStage::UploadingAsset);
    let fail = |e| PublishError::new(PipelineStage::UploadingAsset, e);

    cursor
        .session()
        .set_mode(TransferMode::Binary)
        .await
        .map_err(fail)?;
    cursor
        .goto(&deps.layout.gallery_path())
        .await
        .map_err(fail)?;
    let bytes = cursor
        .session()
        .put(local_asset, filename)
        .await
        .map_err(fail)?;

    debug!(bytes, "Asset uploaded");
    stages.enter(PipelineStage::AssetUploaded);
    Ok(())
}

async fn upload_preview(
    deps: &PipelineDeps,
    cursor: &mut RemoteCursor<'_>,
    stages: &mut StageTracker,
    local_asset: &Path,
    filename: &str,
) -> Result<PathBuf, PublishError> {
    stages.enter(PipelineStage::GeneratingPreview);
    let fail = |e| PublishError::new(PipelineStage::GeneratingPreview, e);

    cursor
        .session()
        .set_mode(TransferMode::Binary)
        .await
        .map_err(fail)?;
    cursor
        .goto(&deps.layout.preview_path())
        .await
        .map_err(fail)?;
    match cursor.session().list().await {
        Ok(entries) => debug!(entries = entries.len(), "Preview directory listed"),
        Err(e) => warn!(error = %e, "Preview directory listing failed"),
    }

    let preview = deps
        .previews
        .generate_preview(local_asset, &deps.cache.preview_dir)
        .await
        .map_err(|e| PublishError::new(PipelineStage::GeneratingPreview, e))?;
    stages.enter(PipelineStage::PreviewReady);
    debug!(preview = %preview.display(), "Preview ready");

    stages.enter(PipelineStage::UploadingPreview);
    cursor
        .session()
        .put(&preview, filename)
        .await
        .map_err(|e| PublishError::new(PipelineStage::UploadingPreview, e))?;
    stages.enter(PipelineStage::PreviewUploaded);

    Ok(preview)
}
