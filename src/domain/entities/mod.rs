//! Domain entity definitions.

mod asset;
mod ids;
mod manifest;
mod message;
mod reaction;
mod remote;
mod secret;

pub use asset::{Asset, AssetFormat, is_plain_filename};
pub use ids::{ChannelId, MessageId, UserId};
pub use manifest::Manifest;
pub use message::{Attachment, ChatMessage};
pub use reaction::{ReactionEmoji, ReactionTrigger};
pub use remote::{RemoteLayout, TransferMode, path_segments};
pub use secret::Secret;
