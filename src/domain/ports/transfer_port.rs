//! Remote file-transfer session port definition.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::entities::TransferMode;
use crate::domain::errors::TransferError;

/// Stateful remote session with a working-directory cursor.
///
/// Every path-taking operation is relative to the current working directory.
#[async_trait]
pub trait TransferSession: Send {
    /// Switches the transfer representation.
    async fn set_mode(&mut self, mode: TransferMode) -> Result<(), TransferError>;

    /// Changes the working directory.
    async fn cwd(&mut self, path: &str) -> Result<(), TransferError>;

    /// Moves the working directory one level up.
    async fn cdup(&mut self) -> Result<(), TransferError>;

    /// Returns the absolute working directory.
    async fn pwd(&mut self) -> Result<String, TransferError>;

    /// Lists the working directory.
    async fn list(&mut self) -> Result<Vec<String>, TransferError>;

    /// Stores `local` as `remote_name` in the working directory.
    async fn put(&mut self, local: &Path, remote_name: &str) -> Result<u64, TransferError>;

    /// Drops and re-establishes the connection, landing at the login root.
    async fn reset(&mut self) -> Result<(), TransferError>;

    /// Ends the session.
    async fn quit(&mut self) -> Result<(), TransferError>;
}
