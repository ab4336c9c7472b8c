use serde::{Deserialize, Serialize};

use crate::domain::entities::{Attachment, ChannelId, ChatMessage, MessageId};

/// Discord API message response, reduced to the fields the bot reads.
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentResponse>,
}

/// Discord API attachment object.
#[derive(Debug, Deserialize)]
pub struct AttachmentResponse {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl MessageResponse {
    /// Converts to the domain message, or `None` if an ID is malformed.
    #[must_use]
    pub fn into_domain(self) -> Option<ChatMessage> {
        let id: MessageId = self.id.parse().ok()?;
        let channel_id: ChannelId = self.channel_id.parse().ok()?;
        let attachments = self
            .attachments
            .into_iter()
            .map(|a| {
                let attachment = Attachment::new(a.url, a.filename).with_size(a.size);
                match a.content_type {
                    Some(content_type) => attachment.with_content_type(content_type),
                    None => attachment,
                }
            })
            .collect();
        Some(ChatMessage::new(id, channel_id).with_attachments(attachments))
    }
}

/// Body of `POST /channels/{id}/messages` for a reply.
#[derive(Debug, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub content: &'a str,
    pub message_reference: MessageReferenceRequest,
    pub allowed_mentions: AllowedMentions,
}

#[derive(Debug, Serialize)]
pub struct MessageReferenceRequest {
    pub message_id: String,
    pub channel_id: String,
    pub fail_if_not_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
    pub replied_user: bool,
}

/// Discord API error response structure.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Error message from Discord.
    pub message: String,
    /// Seconds to wait, present on 429 responses.
    #[serde(default)]
    pub retry_after: Option<f64>,
}
