mod chat_port;
mod fetcher_port;
mod preview_port;
mod transfer_port;

pub use chat_port::ChatPort;
pub use fetcher_port::{FetchedFile, FetcherPort};
pub use preview_port::PreviewPort;
pub use transfer_port::TransferSession;

#[cfg(test)]
pub mod mocks {
    pub use super::chat_port::MockChatPort;
    pub use super::fetcher_port::mock::MockFetcher;
    pub use super::preview_port::mock::MockPreviewGenerator;
    pub use super::transfer_port::mock::MockTransferSession;
}
