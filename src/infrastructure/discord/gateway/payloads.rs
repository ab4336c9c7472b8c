use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constants::{GatewayOpcode, IDENTIFY_LIBRARY, LARGE_THRESHOLD};
use super::events::BotPresence;

#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    fn command(opcode: GatewayOpcode, d: Value) -> Self {
        Self {
            op: opcode.as_u8(),
            d,
            s: None,
            t: None,
        }
    }

    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self::command(
            GatewayOpcode::Heartbeat,
            sequence.map_or(Value::Null, |s| Value::Number(s.into())),
        )
    }

    #[must_use]
    pub fn identify(token: &str, intents: u32, presence: &BotPresence) -> Self {
        let identify = IdentifyData {
            token,
            properties: IdentifyProperties {
                os: std::env::consts::OS,
                browser: IDENTIFY_LIBRARY,
                device: IDENTIFY_LIBRARY,
            },
            compress: false,
            large_threshold: LARGE_THRESHOLD,
            intents,
            presence: PresenceData::from(presence),
        };

        Self::command(
            GatewayOpcode::Identify,
            serde_json::to_value(identify).unwrap_or(Value::Null),
        )
    }

    #[must_use]
    pub fn resume(token: &str, session_id: &str, sequence: u64) -> Self {
        let resume = ResumeData {
            token,
            session_id,
            seq: sequence,
        };

        Self::command(
            GatewayOpcode::Resume,
            serde_json::to_value(resume).unwrap_or(Value::Null),
        )
    }
}

#[derive(Debug, Serialize)]
struct IdentifyData<'a> {
    token: &'a str,
    properties: IdentifyProperties<'a>,
    compress: bool,
    large_threshold: u16,
    intents: u32,
    presence: PresenceData<'a>,
}

#[derive(Debug, Serialize)]
struct IdentifyProperties<'a> {
    os: &'a str,
    browser: &'a str,
    device: &'a str,
}

#[derive(Debug, Serialize)]
struct PresenceData<'a> {
    since: Option<u64>,
    activities: Vec<ActivityData<'a>>,
    status: &'static str,
    afk: bool,
}

impl<'a> From<&'a BotPresence> for PresenceData<'a> {
    fn from(presence: &'a BotPresence) -> Self {
        Self {
            since: None,
            activities: presence
                .activity
                .as_ref()
                .map(|activity| ActivityData {
                    name: &activity.name,
                    kind: activity.kind.as_u8(),
                })
                .into_iter()
                .collect(),
            status: presence.status.as_str(),
            afk: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ActivityData<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Serialize)]
struct ResumeData<'a> {
    token: &'a str,
    session_id: &'a str,
    seq: u64,
}

#[derive(Debug, Deserialize)]
pub struct GatewayMessage {
    pub op: u8,
    pub d: Option<Value>,
    pub s: Option<u64>,
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    pub resume_gateway_url: Option<String>,
    pub user: ReadyUser,
    #[serde(default)]
    pub guilds: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ReadyUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactionPayload {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub guild_id: Option<String>,
    pub emoji: EmojiPayload,
}

#[derive(Debug, Deserialize)]
pub struct EmojiPayload {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::discord::gateway::events::{Activity, ActivityKind, PresenceStatus};

    #[test]
    fn test_heartbeat_serialization() {
        let json = serde_json::to_string(&GatewayPayload::heartbeat(Some(42))).unwrap();
        assert_eq!(json, r#"{"op":1,"d":42}"#);
    }

    #[test]
    fn test_identify_carries_presence() {
        let presence = BotPresence {
            status: PresenceStatus::Online,
            activity: Some(Activity {
                name: "Uploading images. Hopefully.".to_string(),
                kind: ActivityKind::Playing,
            }),
        };
        let payload = GatewayPayload::identify("token", 9217, &presence);

        assert_eq!(payload.op, 2);
        assert_eq!(payload.d["token"], "token");
        assert_eq!(payload.d["intents"], 9217);
        assert_eq!(payload.d["properties"]["browser"], "gallery-courier");
        assert_eq!(payload.d["presence"]["status"], "online");
        assert_eq!(payload.d["presence"]["afk"], false);
        assert!(payload.d["presence"]["since"].is_null());
        assert_eq!(
            payload.d["presence"]["activities"][0]["name"],
            "Uploading images. Hopefully."
        );
        assert_eq!(payload.d["presence"]["activities"][0]["type"], 0);
    }

    #[test]
    fn test_identify_without_activity() {
        let presence = BotPresence {
            status: PresenceStatus::Idle,
            activity: None,
        };
        let payload = GatewayPayload::identify("token", 1, &presence);
        assert_eq!(payload.d["presence"]["activities"], serde_json::json!([]));
        assert_eq!(payload.d["presence"]["status"], "idle");
    }

    #[test]
    fn test_resume_payload() {
        let payload = GatewayPayload::resume("token", "session", 9);
        assert_eq!(payload.op, 6);
        assert_eq!(payload.d["session_id"], "session");
        assert_eq!(payload.d["seq"], 9);
    }

    #[test]
    fn test_reaction_payload_deserialization() {
        let json = r#"{
            "user_id": "548558443624005632",
            "channel_id": "100",
            "message_id": "200",
            "guild_id": "300",
            "member": {"roles": []},
            "emoji": {"id": null, "name": "📤"},
            "type": 0
        }"#;
        let reaction: ReactionPayload = serde_json::from_str(json).unwrap();
        assert_eq!(reaction.emoji.name.as_deref(), Some("📤"));
        assert_eq!(reaction.guild_id.as_deref(), Some("300"));
    }
}
