use async_trait::async_trait;
use std::path::PathBuf;

use super::{DatasetSource, LoadError};

/// Datasets under a local directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DatasetSource for FsSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        tokio::fs::read(self.root.join(path))
            .await
            .map_err(|e| LoadError::Unreachable {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_relative_to_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        let source = FsSource::new(dir.path());
        assert_eq!(source.fetch("a.json").await.unwrap(), b"[]".to_vec());
    }

    #[tokio::test]
    async fn missing_file_is_unreachable() {
        let dir = TempDir::new().unwrap();
        let err = FsSource::new(dir.path()).fetch("nope.json").await.unwrap_err();
        assert!(matches!(err, LoadError::Unreachable { .. }));
    }
}
