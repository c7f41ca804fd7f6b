//! In-memory storage: useful for testing and dry runs.

use async_trait::async_trait;
use rolelog_core::error::StorageError;
use rolelog_core::storage::LogStorage;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps every file as a string in a map.
///
/// Files registered with [`InMemoryStorage::fail_on`] reject writes, which
/// lets tests exercise the router's fallback path.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    files: Arc<RwLock<HashMap<String, String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `file` fail.
    pub async fn fail_on(&self, file: &str) {
        self.failing.write().await.insert(file.to_string());
    }

    /// Current contents of `file`.
    pub async fn read(&self, file: &str) -> Option<String> {
        self.files.read().await.get(file).cloned()
    }

    /// Seed a file, as if left over from an earlier run.
    pub async fn insert(&self, file: &str, text: &str) {
        self.files
            .write()
            .await
            .insert(file.to_string(), text.to_string());
    }

    pub async fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn check_writable(&self, file: &str) -> Result<(), StorageError> {
        if self.failing.read().await.contains(file) {
            return Err(StorageError::WriteFailed {
                file: file.to_string(),
                reason: "simulated failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LogStorage for InMemoryStorage {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn prepare(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn exists(&self, file: &str) -> Result<bool, StorageError> {
        Ok(self.files.read().await.contains_key(file))
    }

    async fn append(&self, file: &str, text: &str) -> Result<(), StorageError> {
        self.check_writable(file).await?;
        self.files
            .write()
            .await
            .entry(file.to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn overwrite(&self, file: &str, text: &str) -> Result<(), StorageError> {
        self.check_writable(file).await?;
        self.insert(file, text).await;
        Ok(())
    }
}
