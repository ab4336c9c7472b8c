//! Publication DTOs.

use std::path::PathBuf;

use uuid::Uuid;

use crate::domain::entities::{Asset, Attachment};

/// Order in which the manifest is committed relative to the images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitOrder {
    /// Manifest first, then asset and preview.
    #[default]
    ManifestFirst,
    /// Asset and preview first, manifest last.
    ManifestLast,
}

/// One requested publication.
#[derive(Debug, Clone)]
pub struct PublicationRequest {
    /// Correlation ID carried in logs.
    pub id: Uuid,
    /// Source URL of the image.
    pub url: String,
    /// Asset to publish.
    pub asset: Asset,
}

impl PublicationRequest {
    /// Builds a request from a chat attachment with a supported format.
    #[must_use]
    pub fn from_attachment(attachment: &Attachment) -> Option<Self> {
        Some(Self {
            id: Uuid::new_v4(),
            url: attachment.url.clone(),
            asset: Asset::new(attachment.filename.clone())?,
        })
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        self.asset.filename()
    }
}

/// Result of a successful publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationReport {
    pub filename: String,
    /// `imageCount` after this publication.
    pub image_count: u64,
    /// Bytes downloaded for the original.
    pub asset_bytes: u64,
    /// Local path of the generated preview.
    pub preview_path: PathBuf,
}

/// Why a reaction did not start a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotOwner,
    WrongEmoji,
    NoAttachments,
}

/// What the trigger listener did with a reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Ignored(IgnoreReason),
    /// Not submitted; the reason was reported in chat.
    Rejected(String),
    Published(PublicationReport),
    Failed(String),
}
