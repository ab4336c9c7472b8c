//! Discord REST API client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, warn};

use super::dto::{
    AllowedMentions, CreateMessageRequest, ErrorResponse, MessageReferenceRequest, MessageResponse,
};
use crate::domain::entities::{ChannelId, ChatMessage, MessageId, Secret};
use crate::domain::errors::ChatError;
use crate::domain::ports::ChatPort;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/linuxmobile/gallery-courier, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Bot-authenticated client for the few REST calls the bot makes.
pub struct DiscordRestClient {
    client: Client,
    base_url: String,
    token: Secret,
}

impl DiscordRestClient {
    /// Creates new client with default base URL.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(token: Secret) -> Result<Self, ChatError> {
        Self::with_base_url(token, DISCORD_API_BASE)
    }

    /// Creates client with custom base URL.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_base_url(token: Secret, base_url: impl Into<String>) -> Result<Self, ChatError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ChatError::unexpected(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token.expose())
    }

    async fn error_from_response(response: reqwest::Response) -> ChatError {
        let status = response.status();
        let body = response.json::<ErrorResponse>().await.ok();
        error_for_status(status, body)
    }
}

fn network_error(e: &reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::network("request timed out")
    } else if e.is_connect() {
        ChatError::network("failed to connect to Discord")
    } else {
        ChatError::network(e.to_string())
    }
}

fn error_for_status(status: StatusCode, body: Option<ErrorResponse>) -> ChatError {
    let message = body
        .as_ref()
        .map_or_else(|| format!("HTTP {status}"), |b| b.message.clone());

    match status {
        StatusCode::UNAUTHORIZED => ChatError::rejected("invalid bot token"),
        StatusCode::FORBIDDEN => ChatError::rejected(format!("missing access: {message}")),
        StatusCode::NOT_FOUND => ChatError::rejected(format!("not found: {message}")),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = body.and_then(|b| b.retry_after).unwrap_or(5.0);
            ChatError::RateLimited {
                retry_after_ms: (retry_after * 1000.0).ceil() as u64,
            }
        }
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ChatError::network("Discord API is temporarily unavailable")
        }
        _ => ChatError::unexpected(format!("unexpected response: {status} - {message}")),
    }
}

#[async_trait]
impl ChatPort for DiscordRestClient {
    async fn fetch_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<ChatMessage, ChatError> {
        let url = format!(
            "{}/channels/{channel_id}/messages/{message_id}",
            self.base_url
        );
        debug!(channel_id = %channel_id, message_id = %message_id, "Fetching message");

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to connect to Discord API");
                network_error(&e)
            })?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let payload: MessageResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse message response");
            ChatError::unexpected(format!("failed to parse response: {e}"))
        })?;

        let message = payload
            .into_domain()
            .ok_or_else(|| ChatError::unexpected("message response carried a malformed ID"))?;
        debug!(
            message_id = %message.id,
            attachments = message.attachments.len(),
            "Message fetched"
        );
        Ok(message)
    }

    async fn reply(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        content: &str,
    ) -> Result<(), ChatError> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let body = CreateMessageRequest {
            content,
            message_reference: MessageReferenceRequest {
                message_id: message_id.to_string(),
                channel_id: channel_id.to_string(),
                fail_if_not_exists: false,
            },
            allowed_mentions: AllowedMentions {
                parse: Vec::new(),
                replied_user: false,
            },
        };

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        debug!(channel_id = %channel_id, "Reply posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DiscordRestClient::new(Secret::new("token"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_authorization_uses_bot_scheme() {
        let client =
            DiscordRestClient::with_base_url(Secret::new("abc.def"), "http://localhost/").unwrap();
        assert_eq!(client.authorization(), "Bot abc.def");
        assert_eq!(client.base_url, "http://localhost");
    }

    #[test]
    fn test_rate_limit_carries_retry_after() {
        let err = error_for_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some(ErrorResponse {
                message: "You are being rate limited.".to_string(),
                retry_after: Some(1.25),
            }),
        );
        assert!(matches!(
            err,
            ChatError::RateLimited {
                retry_after_ms: 1250
            }
        ));
        assert!(err.is_network_error());
    }

    #[test]
    fn test_missing_message_is_rejected() {
        let err = error_for_status(
            StatusCode::NOT_FOUND,
            Some(ErrorResponse {
                message: "Unknown Message".to_string(),
                retry_after: None,
            }),
        );
        assert!(err.to_string().contains("Unknown Message"));
    }
}
