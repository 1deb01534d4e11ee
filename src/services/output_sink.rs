//! Where generated playlists are written

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{AppError, AppResult};

/// Destination for generated playlist files
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Write `contents` under `filename`, replacing any previous file, and
    /// return where it landed
    async fn write_file(&self, filename: &str, contents: &str) -> AppResult<PathBuf>;
}

/// Writes files into a local directory, creating it on first use
#[derive(Debug, Clone)]
pub struct LocalOutputDirectory {
    root: PathBuf,
}

impl LocalOutputDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl OutputSink for LocalOutputDirectory {
    async fn write_file(&self, filename: &str, contents: &str) -> AppResult<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(AppError::validation(format!(
                "Invalid output filename: '{filename}'"
            )));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::io(self.root.display().to_string(), e))?;

        let path = self.root.join(filename);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| AppError::io(path.display().to_string(), e))?;

        debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalOutputDirectory::new(dir.path().join("nested"));

        let path = sink.write_file("a.m3u", "first").await.unwrap();
        sink.write_file("a.m3u", "second").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalOutputDirectory::new(dir.path());
        assert!(sink.write_file("../escape.m3u", "x").await.is_err());
        assert!(sink.write_file("", "x").await.is_err());
    }
}
