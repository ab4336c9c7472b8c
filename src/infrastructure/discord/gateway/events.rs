use serde::{Deserialize, Serialize};

use crate::domain::entities::{ReactionTrigger, UserId};

#[derive(Debug, Clone)]
pub enum GatewayEventKind {
    Connected {
        session_id: String,
        resume_url: Option<String>,
    },
    Disconnected {
        reason: String,
        can_resume: bool,
    },
    Reconnecting {
        attempt: u32,
    },
    Resumed,
    HeartbeatAck {
        latency_ms: u64,
    },
    Dispatch(DispatchEvent),
    Error {
        message: String,
        recoverable: bool,
    },
}

/// Dispatches the bot acts on. Everything else arrives as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Ready {
        session_id: String,
        resume_gateway_url: Option<String>,
        user_id: UserId,
        username: String,
        guild_count: usize,
    },
    MessageReactionAdd {
        trigger: ReactionTrigger,
        guild_id: Option<u64>,
    },
    Unknown {
        event_type: String,
    },
}

impl DispatchEvent {
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "READY",
            Self::MessageReactionAdd { .. } => "MESSAGE_REACTION_ADD",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Online,
    Idle,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    Invisible,
}

impl PresenceStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::DoNotDisturb => "dnd",
            Self::Invisible => "invisible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    #[default]
    Playing,
    Streaming,
    Listening,
    Watching,
    Competing,
}

impl ActivityKind {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Playing => 0,
            Self::Streaming => 1,
            Self::Listening => 2,
            Self::Watching => 3,
            Self::Competing => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(default)]
    pub kind: ActivityKind,
}

/// Presence announced in IDENTIFY.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BotPresence {
    #[serde(default)]
    pub status: PresenceStatus,
    #[serde(default)]
    pub activity: Option<Activity>,
}

impl BotPresence {
    /// Online and "Playing" the given activity.
    #[must_use]
    pub fn playing(name: impl Into<String>) -> Self {
        Self {
            status: PresenceStatus::Online,
            activity: Some(Activity {
                name: name.into(),
                kind: ActivityKind::Playing,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_status_serde() {
        let status: PresenceStatus = serde_json::from_str(r#""dnd""#).unwrap();
        assert_eq!(status, PresenceStatus::DoNotDisturb);
        assert_eq!(status.as_str(), "dnd");
    }

    #[test]
    fn test_activity_kind_codes() {
        assert_eq!(ActivityKind::Playing.as_u8(), 0);
        assert_eq!(ActivityKind::Competing.as_u8(), 5);
    }

    #[test]
    fn test_playing_presence() {
        let presence = BotPresence::playing("Uploading images. Hopefully.");
        assert_eq!(presence.status, PresenceStatus::Online);
        assert_eq!(
            presence.activity.map(|a| a.kind),
            Some(ActivityKind::Playing)
        );
    }
}
