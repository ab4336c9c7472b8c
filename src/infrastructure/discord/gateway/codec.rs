use flate2::{Decompress, FlushDecompress, Status};

use super::constants::ZLIB_SUFFIX;
use super::error::{GatewayError, GatewayResult};
use super::events::DispatchEvent;
use super::payloads::{GatewayMessage, HelloPayload, ReactionPayload, ReadyPayload};

use crate::domain::entities::{ReactionEmoji, ReactionTrigger};

const CHUNK_SIZE: usize = 32 * 1024;
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Inflates the shared `zlib-stream` transport. One inflater lives for the
/// whole connection, frames end at the sync-flush suffix.
pub struct GatewayCodec {
    inflater: Decompress,
    pending: Vec<u8>,
}

impl GatewayCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(true),
            pending: Vec::with_capacity(4096),
        }
    }

    /// Buffers `data` and returns the inflated text once a frame is complete.
    pub fn decode_binary(&mut self, data: &[u8]) -> GatewayResult<Option<String>> {
        self.pending.extend_from_slice(data);

        if !self.pending.ends_with(&ZLIB_SUFFIX) {
            return Ok(None);
        }

        let result = self.inflate();
        self.pending.clear();
        result.map(Some)
    }

    fn inflate(&mut self) -> GatewayResult<String> {
        let mut out = Vec::with_capacity(CHUNK_SIZE);
        let mut offset = 0;

        loop {
            if out.len() == out.capacity() {
                if out.capacity() >= MAX_FRAME_SIZE {
                    return Err(GatewayError::compression(
                        "decompressed frame exceeds maximum size",
                    ));
                }
                out.reserve(out.capacity().min(MAX_FRAME_SIZE - out.capacity()));
            }

            let in_before = self.inflater.total_in();
            let out_before = out.len();
            let status = self
                .inflater
                .decompress_vec(&self.pending[offset..], &mut out, FlushDecompress::Sync)
                .map_err(|e| GatewayError::compression(e.to_string()))?;
            offset += usize::try_from(self.inflater.total_in() - in_before).unwrap_or(0);

            let has_room = out.len() < out.capacity();
            let stalled = offset >= self.pending.len() || out.len() == out_before;
            if status == Status::StreamEnd || (has_room && stalled) {
                break;
            }
        }

        String::from_utf8(out).map_err(|e| GatewayError::compression(format!("invalid UTF-8: {e}")))
    }

    pub fn reset(&mut self) {
        self.inflater.reset(true);
        self.pending.clear();
    }
}

impl Default for GatewayCodec {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventParser;

impl EventParser {
    pub fn parse_message(json: &str) -> GatewayResult<GatewayMessage> {
        serde_json::from_str(json).map_err(|e| GatewayError::serialization(e.to_string()))
    }

    pub fn parse_hello(data: &serde_json::Value) -> GatewayResult<HelloPayload> {
        serde_json::from_value(data.clone()).map_err(|e| GatewayError::serialization(e.to_string()))
    }

    pub fn parse_dispatch(event_type: &str, data: &serde_json::Value) -> GatewayResult<DispatchEvent> {
        match event_type {
            "READY" => Self::parse_ready(data),
            "MESSAGE_REACTION_ADD" => Self::parse_reaction_add(data),
            other => Ok(DispatchEvent::Unknown {
                event_type: other.to_string(),
            }),
        }
    }

    fn parse_ready(data: &serde_json::Value) -> GatewayResult<DispatchEvent> {
        let payload: ReadyPayload = serde_json::from_value(data.clone())
            .map_err(|e| GatewayError::serialization(format!("READY: {e}")))?;
        let user_id = payload
            .user
            .id
            .parse()
            .map_err(|_| GatewayError::protocol("READY carried a malformed user ID"))?;

        Ok(DispatchEvent::Ready {
            session_id: payload.session_id,
            resume_gateway_url: payload.resume_gateway_url,
            user_id,
            username: payload.user.username,
            guild_count: payload.guilds.len(),
        })
    }

    fn parse_reaction_add(data: &serde_json::Value) -> GatewayResult<DispatchEvent> {
        let payload: ReactionPayload = serde_json::from_value(data.clone())
            .map_err(|e| GatewayError::serialization(format!("MESSAGE_REACTION_ADD: {e}")))?;
        let malformed = |_| GatewayError::protocol("reaction carried a malformed ID");

        let trigger = ReactionTrigger {
            channel_id: payload.channel_id.parse().map_err(malformed)?,
            message_id: payload.message_id.parse().map_err(malformed)?,
            user_id: payload.user_id.parse().map_err(malformed)?,
            emoji: ReactionEmoji {
                id: payload.emoji.id,
                name: payload.emoji.name,
            },
        };

        Ok(DispatchEvent::MessageReactionAdd {
            trigger,
            guild_id: payload.guild_id.and_then(|id| id.parse().ok()),
        })
    }
}
