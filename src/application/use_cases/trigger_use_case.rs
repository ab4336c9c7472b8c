//! Reaction trigger handling.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::dto::{IgnoreReason, PublicationRequest, TriggerOutcome};
use crate::application::services::{SubmitError, WorkerHandle};
use crate::domain::entities::{ChannelId, MessageId, ReactionTrigger, UserId};
use crate::domain::ports::ChatPort;

/// Turns owner reactions into publications and reports the result in chat.
#[derive(Clone)]
pub struct TriggerListener {
    chat: Arc<dyn ChatPort>,
    worker: WorkerHandle,
    owner_id: UserId,
    emoji: String,
}

impl TriggerListener {
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatPort>,
        worker: WorkerHandle,
        owner_id: UserId,
        emoji: impl Into<String>,
    ) -> Self {
        Self {
            chat,
            worker,
            owner_id,
            emoji: emoji.into(),
        }
    }

    /// Handles one reaction event.
    ///
    /// Waits for the publication to finish when one is started. Never fails:
    /// every problem ends up in the returned outcome and, where a message
    /// exists to reply to, in chat.
    pub async fn handle_reaction(&self, trigger: ReactionTrigger) -> TriggerOutcome {
        if trigger.user_id != self.owner_id {
            debug!(user_id = %trigger.user_id, "Ignoring reaction from non-owner");
            return TriggerOutcome::Ignored(IgnoreReason::NotOwner);
        }
        if !trigger.emoji.matches(&self.emoji) {
            debug!(emoji = ?trigger.emoji.name, "Ignoring reaction with other emoji");
            return TriggerOutcome::Ignored(IgnoreReason::WrongEmoji);
        }

        let ReactionTrigger {
            channel_id,
            message_id,
            ..
        } = trigger;

        let message = match self.chat.fetch_message(channel_id, message_id).await {
            Ok(message) => message,
            Err(e) => {
                warn!(channel_id = %channel_id, message_id = %message_id, error = %e, "Failed to fetch reacted message");
                return TriggerOutcome::Failed(e.to_string());
            }
        };

        let Some(attachment) = message.first_attachment() else {
            info!(message_id = %message_id, "Reacted message has no attachments");
            return TriggerOutcome::Ignored(IgnoreReason::NoAttachments);
        };

        let Some(request) = PublicationRequest::from_attachment(attachment) else {
            let reason = format!("`{}` is not a PNG or JPEG image", attachment.filename);
            info!(filename = %attachment.filename, "Unsupported attachment");
            self.acknowledge(channel_id, message_id, &format!("Skipped: {reason}."))
                .await;
            return TriggerOutcome::Rejected(reason);
        };
        let filename = request.filename().to_string();

        let pending = match self.worker.submit(request) {
            Ok(pending) => pending,
            Err(e) => {
                info!(filename = %filename, reason = %e, "Publication not accepted");
                self.acknowledge(channel_id, message_id, &format!("Not published: {e}."))
                    .await;
                return TriggerOutcome::Rejected(e.to_string());
            }
        };

        match pending.await {
            Ok(Ok(report)) => {
                let text = format!(
                    "Published `{}`. The gallery now holds {} images.",
                    report.filename, report.image_count
                );
                self.acknowledge(channel_id, message_id, &text).await;
                TriggerOutcome::Published(report)
            }
            Ok(Err(e)) => {
                self.acknowledge(
                    channel_id,
                    message_id,
                    &format!("Could not publish `{filename}`: {e}."),
                )
                .await;
                TriggerOutcome::Failed(e.to_string())
            }
            Err(_) => {
                let reason = SubmitError::ShuttingDown.to_string();
                self.acknowledge(channel_id, message_id, &format!("Not published: {reason}."))
                    .await;
                TriggerOutcome::Rejected(reason)
            }
        }
    }

    async fn acknowledge(&self, channel_id: ChannelId, message_id: MessageId, content: &str) {
        if let Err(e) = self.chat.reply(channel_id, message_id, content).await {
            warn!(channel_id = %channel_id, error = %e, "Failed to post reply");
        }
    }
}
