//! Application services shared by the use cases.

mod cache_manager;
mod manifest_sync;
mod publication_worker;
mod remote_cursor;

pub use cache_manager::{CacheLayout, ensure_directories};
pub use manifest_sync::{ManifestSynchronizer, PreparedManifest};
pub use publication_worker::{
    BusyPolicy, PendingPublication, PublicationWorker, SubmitError, WorkerConfig, WorkerHandle,
};
pub use remote_cursor::RemoteCursor;
