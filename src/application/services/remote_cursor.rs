//! Working-directory tracking for a transfer session.

use tracing::{debug, warn};

use crate::domain::entities::path_segments;
use crate::domain::errors::TransferError;
use crate::domain::ports::TransferSession;

/// Tracks where a transfer session is relative to the root it started at.
///
/// Navigation goes through [`RemoteCursor::goto`], which keeps a stack of the
/// directories entered, and [`RemoteCursor::restore`] returns to the root in one
/// call.
pub struct RemoteCursor<'s> {
    session: &'s mut dyn TransferSession,
    root: String,
    stack: Vec<String>,
}

impl<'s> RemoteCursor<'s> {
    /// Captures the current working directory as the root.
    ///
    /// # Errors
    /// Returns error if the working directory cannot be queried.
    pub async fn begin(session: &'s mut dyn TransferSession) -> Result<Self, TransferError> {
        let root = session.pwd().await?;
        debug!(root = %root, "Remote cursor anchored");
        Ok(Self {
            session,
            root,
            stack: Vec::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Number of directories below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Current position relative to the root.
    #[must_use]
    pub fn current(&self) -> String {
        self.stack.join("/")
    }

    /// Moves to `target`, given relative to the root.
    ///
    /// Descends relatively when `target` lies below the current position,
    /// otherwise returns to the root first.
    ///
    /// # Errors
    /// Returns error if a directory change fails.
    pub async fn goto(&mut self, target: &str) -> Result<(), TransferError> {
        let segments: Vec<String> = path_segments(target).into_iter().map(String::from).collect();

        if !segments.starts_with(&self.stack) {
            self.restore().await?;
        }

        let remaining = &segments[self.stack.len()..];
        if remaining.is_empty() {
            return Ok(());
        }

        let relative = remaining.join("/");
        self.session.cwd(&relative).await?;
        self.stack.extend(remaining.iter().cloned());
        debug!(cwd = %self.current(), "Remote cursor moved");
        Ok(())
    }

    /// Returns to the root.
    ///
    /// Uses an absolute change first and falls back to one `CDUP` per level.
    ///
    /// # Errors
    /// Returns error if neither strategy reaches the root.
    pub async fn restore(&mut self) -> Result<(), TransferError> {
        if self.stack.is_empty() {
            return Ok(());
        }

        match self.session.cwd(&self.root).await {
            Ok(()) => {
                self.stack.clear();
                debug!(root = %self.root, "Remote cursor restored");
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "Absolute directory change failed, stepping up instead");
            }
        }

        while !self.stack.is_empty() {
            self.session.cdup().await?;
            self.stack.pop();
        }
        Ok(())
    }

    /// Returns the underlying session for commands that do not move the cursor.
    pub fn session(&mut self) -> &mut dyn TransferSession {
        &mut *self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockTransferSession;

    fn server() -> MockTransferSession {
        MockTransferSession::with_dirs(&["subdomain-sinon/images/gallery/preview"])
    }

    #[tokio::test]
    async fn test_descends_relatively() {
        let mock = server();
        let mut session = mock.clone();
        let mut cursor = RemoteCursor::begin(&mut session).await.unwrap();

        cursor.goto("subdomain-sinon").await.unwrap();
        cursor.goto("subdomain-sinon/images/gallery").await.unwrap();
        cursor.goto("subdomain-sinon/images/gallery/preview").await.unwrap();

        assert_eq!(cursor.depth(), 4);
        assert_eq!(
            mock.log(),
            vec!["PWD", "CWD subdomain-sinon", "CWD images/gallery", "CWD preview"]
        );
        assert_eq!(mock.cwd_now(), "/subdomain-sinon/images/gallery/preview");
    }

    #[tokio::test]
    async fn test_restore_returns_to_root() {
        let mock = server();
        let mut session = mock.clone();
        let mut cursor = RemoteCursor::begin(&mut session).await.unwrap();
        cursor.goto("subdomain-sinon/images/gallery").await.unwrap();

        cursor.restore().await.unwrap();

        assert_eq!(cursor.depth(), 0);
        assert_eq!(mock.cwd_now(), "/");
    }

    #[tokio::test]
    async fn test_sideways_move_goes_through_root() {
        let mock = MockTransferSession::with_dirs(&["a/b", "c"]);
        let mut session = mock.clone();
        let mut cursor = RemoteCursor::begin(&mut session).await.unwrap();

        cursor.goto("a/b").await.unwrap();
        cursor.goto("c").await.unwrap();

        assert_eq!(mock.cwd_now(), "/c");
        assert_eq!(cursor.current(), "c");
    }

    #[tokio::test]
    async fn test_restore_falls_back_to_cdup() {
        let mock = server();
        let mut session = mock.clone();
        let mut cursor = RemoteCursor::begin(&mut session).await.unwrap();
        cursor.goto("subdomain-sinon/images").await.unwrap();

        mock.fail_on("CWD /");
        cursor.restore().await.unwrap();

        let cdups = mock.log().iter().filter(|op| *op == "CDUP").count();
        assert_eq!(cdups, 2);
        assert_eq!(mock.cwd_now(), "/");
    }

    #[tokio::test]
    async fn test_failed_descent_keeps_stack() {
        let mock = server();
        let mut session = mock.clone();
        let mut cursor = RemoteCursor::begin(&mut session).await.unwrap();

        assert!(cursor.goto("missing/dir").await.is_err());
        assert_eq!(cursor.depth(), 0);
    }
}
