//! Chat message data consumed by the trigger listener.

use super::{ChannelId, MessageId};

/// File attached to a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// CDN URL of the file.
    pub url: String,
    /// Original filename.
    pub filename: String,
    /// Size in bytes as reported by Discord.
    pub size: u64,
    /// MIME type when Discord provides one.
    pub content_type: Option<String>,
}

impl Attachment {
    #[must_use]
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            size: 0,
            content_type: None,
        }
    }

    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A fully fetched chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub attachments: Vec<Attachment>,
}

impl ChatMessage {
    #[must_use]
    pub const fn new(id: MessageId, channel_id: ChannelId) -> Self {
        Self {
            id,
            channel_id,
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Returns the attachment a publication is built from.
    #[must_use]
    pub fn first_attachment(&self) -> Option<&Attachment> {
        self.attachments.first()
    }
}
