//! Gateway websocket: handshake, heartbeats, resume and the two
//! dispatches the bot cares about.

mod client;
mod codec;
mod connection;
mod constants;
mod error;
mod events;
mod heartbeat;
mod payloads;
mod session;
mod state;

pub use client::{GatewayClient, GatewayClientConfig};
pub use connection::GatewayConnection;
pub use constants::{GatewayIntents, GatewayOpcode};
pub use error::{GatewayError, GatewayResult, Recovery};
pub use events::{Activity, ActivityKind, BotPresence, DispatchEvent, GatewayEventKind, PresenceStatus};
pub use session::SessionInfo;
pub use state::{ConnectionState, GatewayState};
