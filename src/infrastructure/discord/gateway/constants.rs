use std::time::Duration;

pub const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json&compress=zlib-stream";
pub const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

pub const HEARTBEAT_JITTER_PERCENT: f64 = 0.05;

pub const RECONNECT_DELAY_BASE: Duration = Duration::from_secs(1);
pub const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(60);
pub const RECONNECT_JITTER_MAX: Duration = Duration::from_millis(500);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(10);
pub const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

pub const IDENTIFY_LIBRARY: &str = env!("CARGO_PKG_NAME");
pub const LARGE_THRESHOLD: u16 = 50;

/// Gateway opcodes the bot sends or handles.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOpcode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    Resume = 6,
    Reconnect = 7,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

impl GatewayOpcode {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            6 => Self::Resume,
            7 => Self::Reconnect,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Intent bitfield sent with identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GatewayIntents(u32);

impl GatewayIntents {
    pub const GUILDS: Self = Self(1 << 0);
    pub const GUILD_MESSAGE_REACTIONS: Self = Self(1 << 10);
    pub const DIRECT_MESSAGE_REACTIONS: Self = Self(1 << 13);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Guild metadata plus reaction events from guilds and DMs.
    /// Message content is not requested; attachments come from REST.
    #[must_use]
    pub const fn reaction_bot() -> Self {
        Self::GUILDS
            .union(Self::GUILD_MESSAGE_REACTIONS)
            .union(Self::DIRECT_MESSAGE_REACTIONS)
    }
}
