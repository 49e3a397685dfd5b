use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::ObjectStore;

/// Stores objects as files under a root directory and returns `file://` URLs.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            anyhow::bail!("Invalid object key: {key:?}");
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl ObjectStore for DirectoryStore {
    fn name(&self) -> &str {
        "directory"
    }

    async fn store(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let absolute = std::path::absolute(&path).context("Failed to resolve object path")?;
        log::debug!("Stored {} bytes at {}", bytes.len(), absolute.display());
        Ok(format!("file://{}", absolute.display()))
    }
}
