//! Preview generation port definition.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::PreviewError;

/// Port for producing compressed previews of cached images.
#[async_trait]
pub trait PreviewPort: Send + Sync {
    /// Writes a preview of `source` into `dest_dir` and returns its path.
    async fn generate_preview(&self, source: &Path, dest_dir: &Path)
    -> Result<PathBuf, PreviewError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::domain::entities::AssetFormat;

    /// Copies the source as its own preview and records the chosen profile.
    #[derive(Clone, Default)]
    pub struct MockPreviewGenerator {
        profiles: Arc<Mutex<Vec<AssetFormat>>>,
        fail_with: Arc<Mutex<Option<String>>>,
    }

    impl MockPreviewGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(message: &str) -> Self {
            let mock = Self::default();
            *mock.fail_with.lock() = Some(message.to_string());
            mock
        }

        pub fn profiles(&self) -> Vec<AssetFormat> {
            self.profiles.lock().clone()
        }
    }

    #[async_trait]
    impl PreviewPort for MockPreviewGenerator {
        async fn generate_preview(
            &self,
            source: &Path,
            dest_dir: &Path,
        ) -> Result<PathBuf, PreviewError> {
            let filename = source
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let format =
                AssetFormat::from_filename(&filename).ok_or_else(|| PreviewError::unsupported(&filename))?;

            if let Some(message) = self.fail_with.lock().clone() {
                return Err(PreviewError::compression(filename, message));
            }

            self.profiles.lock().push(format);
            let dest = dest_dir.join(&filename);
            tokio::fs::copy(source, &dest).await?;
            Ok(dest)
        }
    }
}
