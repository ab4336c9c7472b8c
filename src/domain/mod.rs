//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{Asset, AssetFormat, Manifest, ReactionTrigger, RemoteLayout, Secret};
pub use errors::{PipelineStage, PublishError};
pub use ports::{ChatPort, FetcherPort, PreviewPort, TransferSession};
