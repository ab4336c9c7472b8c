//! Chat platform port definition.

use async_trait::async_trait;

use crate::domain::entities::{ChannelId, ChatMessage, MessageId};
use crate::domain::errors::ChatError;

/// Port for the chat platform operations the bot needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Fetches a message with its attachment list.
    async fn fetch_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<ChatMessage, ChatError>;

    /// Posts `content` in `channel_id` as a reply to `message_id`.
    async fn reply(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        content: &str,
    ) -> Result<(), ChatError>;
}
