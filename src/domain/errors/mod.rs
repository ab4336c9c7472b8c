//! Domain error types.

mod cache_error;
mod chat_error;
mod fetch_error;
mod preview_error;
mod publish_error;
mod sync_error;
mod transfer_error;

pub use cache_error::CacheError;
pub use chat_error::ChatError;
pub use fetch_error::FetchError;
pub use preview_error::PreviewError;
pub use publish_error::{PipelineStage, PublishError, PublishFailure};
pub use sync_error::SyncError;
pub use transfer_error::TransferError;
