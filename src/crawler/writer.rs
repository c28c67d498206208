use crate::MirrorError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Persists rewritten documents
#[async_trait]
pub trait Writer: Send + Sync {
    /// Writes `content` at `path`, relative to the mirror root, creating parent directories
    ///
    /// Any failure is reported as [`MirrorError::FatalIo`] and ends the run.
    async fn write(&self, path: &Path, content: &[u8]) -> Result<(), MirrorError>;
}

/// [`Writer`] storing files below an output directory
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Writer for FsWriter {
    async fn write(&self, path: &Path, content: &[u8]) -> Result<(), MirrorError> {
        let target = self.root.join(path);
        let fatal = |source| MirrorError::FatalIo {
            path: target.clone(),
            source,
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(fatal)?;
        }
        tokio::fs::write(&target, content).await.map_err(fatal)?;

        tracing::debug!("Wrote {} ({} bytes)", target.display(), content.len());
        Ok(())
    }
}
