//! Filesystem storage: plain files inside one log directory.
//!
//! Storage location: `logs.dir` from the config (default `./logs`).

use async_trait::async_trait;
use rolelog_core::error::StorageError;
use rolelog_core::storage::LogStorage;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writes log files under a root directory.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create storage over `root` and make sure the directory is usable.
    pub async fn open(root: impl Into<PathBuf>) -> rolelog_core::Result<Self> {
        let storage = Self::new(root);
        storage.prepare().await?;
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a file inside the log directory.
    pub fn path_of(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    async fn ensure_root(&self, file: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| write_failed(file, &format!("Failed to create log directory: {e}")))
    }
}

fn write_failed(file: &str, reason: &str) -> StorageError {
    StorageError::WriteFailed {
        file: file.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl LogStorage for FsStorage {
    fn name(&self) -> &str {
        "fs"
    }

    async fn prepare(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            StorageError::Unavailable(format!("{}: {e}", self.root.display()))
        })?;
        debug!(root = %self.root.display(), "Log directory ready");
        Ok(())
    }

    async fn exists(&self, file: &str) -> Result<bool, StorageError> {
        tokio::fs::try_exists(self.path_of(file))
            .await
            .map_err(|e| StorageError::ReadFailed {
                file: file.to_string(),
                reason: e.to_string(),
            })
    }

    async fn append(&self, file: &str, text: &str) -> Result<(), StorageError> {
        self.ensure_root(file).await?;
        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_of(file))
            .await
            .map_err(|e| write_failed(file, &e.to_string()))?;
        handle
            .write_all(text.as_bytes())
            .await
            .map_err(|e| write_failed(file, &e.to_string()))?;
        handle
            .flush()
            .await
            .map_err(|e| write_failed(file, &e.to_string()))
    }

    async fn overwrite(&self, file: &str, text: &str) -> Result<(), StorageError> {
        self.ensure_root(file).await?;
        tokio::fs::write(self.path_of(file), text)
            .await
            .map_err(|e| write_failed(file, &e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prepare_creates_nested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("a").join("logs");
        let storage = FsStorage::new(&root);
        storage.prepare().await.unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn append_creates_then_extends() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(tmp.path());
        assert!(!storage.exists("request_nova.log").await.unwrap());

        storage.append("request_nova.log", "one\n").await.unwrap();
        storage.append("request_nova.log", "two\n").await.unwrap();

        assert!(storage.exists("request_nova.log").await.unwrap());
        let content = std::fs::read_to_string(storage.path_of("request_nova.log")).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[tokio::test]
    async fn overwrite_replaces_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(tmp.path());
        storage.overwrite("raw.json", "[1]").await.unwrap();
        storage.overwrite("raw.json", "[2]").await.unwrap();
        let content = std::fs::read_to_string(storage.path_of("raw.json")).unwrap();
        assert_eq!(content, "[2]");
    }

    #[tokio::test]
    async fn writes_recreate_a_removed_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("logs");
        let storage = FsStorage::new(&root);
        storage.prepare().await.unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        storage.append("request_bob.log", "entry").await.unwrap();
        assert!(root.join("request_bob.log").exists());
    }

    #[tokio::test]
    async fn root_that_is_a_file_fails_to_write() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let storage = FsStorage::new(tmp.path());
        let err = storage.append("request_bob.log", "entry").await.unwrap_err();
        assert!(matches!(err, StorageError::WriteFailed { .. }));
    }

    #[tokio::test]
    async fn open_on_a_file_is_a_storage_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = match FsStorage::open(tmp.path()).await {
            Ok(_) => panic!("opened storage over a plain file"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            rolelog_core::Error::Storage(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn open_creates_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("logs");
        let storage = FsStorage::open(&root).await.unwrap();
        assert_eq!(storage.root(), root.as_path());
        assert!(root.is_dir());
    }
}
