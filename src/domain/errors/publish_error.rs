//! Publication pipeline error types.

use std::fmt;

use thiserror::Error;

use super::{FetchError, PreviewError, SyncError, TransferError};

/// Step of the publication state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Idle,
    FetchingAsset,
    Fetched,
    ManifestSync,
    ManifestUpdated,
    UploadingManifest,
    ManifestUploaded,
    UploadingAsset,
    AssetUploaded,
    GeneratingPreview,
    PreviewReady,
    UploadingPreview,
    PreviewUploaded,
    RestoreCursor,
}

impl PipelineStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingAsset => "fetching asset",
            Self::Fetched => "fetched",
            Self::ManifestSync => "manifest sync",
            Self::ManifestUpdated => "manifest updated",
            Self::UploadingManifest => "uploading manifest",
            Self::ManifestUploaded => "manifest uploaded",
            Self::UploadingAsset => "uploading asset",
            Self::AssetUploaded => "asset uploaded",
            Self::GeneratingPreview => "generating preview",
            Self::PreviewReady => "preview ready",
            Self::UploadingPreview => "uploading preview",
            Self::PreviewUploaded => "preview uploaded",
            Self::RestoreCursor => "restoring cursor",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause of a failed publication.
#[derive(Debug, Error)]
pub enum PublishFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// A publication that aborted at `stage`.
#[derive(Debug, Error)]
#[error("publication failed while {stage}: {failure}")]
pub struct PublishError {
    pub stage: PipelineStage,
    #[source]
    pub failure: PublishFailure,
}

impl PublishError {
    #[must_use]
    pub fn new(stage: PipelineStage, failure: impl Into<PublishFailure>) -> Self {
        Self {
            stage,
            failure: failure.into(),
        }
    }

    /// Returns whether the remote manifest could not be parsed.
    #[must_use]
    pub fn is_manifest_parse_failure(&self) -> bool {
        matches!(&self.failure, PublishFailure::Sync(e) if e.is_parse_error())
    }

    /// Returns whether the transfer session is unusable until it is reset.
    #[must_use]
    pub fn needs_session_reset(&self) -> bool {
        match &self.failure {
            PublishFailure::Transfer(e) | PublishFailure::Sync(SyncError::Transfer(e)) => {
                e.needs_reset()
            }
            _ => false,
        }
    }

    /// Returns whether the asset format was rejected.
    #[must_use]
    pub fn is_unsupported_format(&self) -> bool {
        matches!(&self.failure, PublishFailure::Preview(e) if e.is_unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_stage() {
        let err = PublishError::new(
            PipelineStage::UploadingAsset,
            TransferError::command("STOR cat.png", "550 denied"),
        );
        assert_eq!(
            err.to_string(),
            "publication failed while uploading asset: STOR cat.png failed: 550 denied"
        );
    }

    #[test]
    fn test_dropped_connection_needs_reset() {
        let io = || std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let direct = PublishError::new(PipelineStage::UploadingAsset, TransferError::Io(io()));
        let via_sync = PublishError::new(
            PipelineStage::UploadingManifest,
            SyncError::Transfer(TransferError::Io(io())),
        );
        let refused = PublishError::new(
            PipelineStage::UploadingAsset,
            TransferError::command("STOR cat.png", "550 denied"),
        );

        assert!(direct.needs_session_reset());
        assert!(via_sync.needs_session_reset());
        assert!(!refused.needs_session_reset());
    }

    #[test]
    fn test_parse_failure_predicate() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PublishError::new(PipelineStage::ManifestSync, SyncError::Parse(parse));
        assert!(err.is_manifest_parse_failure());
        assert!(!err.is_unsupported_format());
    }
}
