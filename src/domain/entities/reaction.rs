//! Reaction events that may trigger a publication.

use super::{ChannelId, MessageId, UserId};

/// Emoji attached to a reaction event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEmoji {
    /// Custom emoji ID, absent for unicode emoji.
    pub id: Option<String>,
    /// Unicode character or custom emoji name.
    pub name: Option<String>,
}

impl ReactionEmoji {
    /// Creates a unicode emoji.
    #[must_use]
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Returns whether this emoji's name matches `name`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// A "reaction added" event reduced to what the bot needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionTrigger {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: ReactionEmoji,
}
