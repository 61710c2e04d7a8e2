//! Local storage for generated images.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use uuid::Uuid;

/// Directory where generated cover images are written before upload.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a fresh `cover-<uuid>.png` and return its path.
    pub async fn store(&self, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create image cache {}", self.dir.display()))?;
        let path = self.dir.join(format!("cover-{}.png", Uuid::new_v4().simple()));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write image {}", path.display()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "cached image");
        Ok(path)
    }
}
