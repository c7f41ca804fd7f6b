//! Storage trait: where transcript logs end up.
//!
//! The log router only needs four operations on named files inside one log
//! directory, so backends stay small: the filesystem in production and an
//! in-memory map in tests.

use async_trait::async_trait;

use crate::error::StorageError;

/// A flat namespace of text files.
#[async_trait]
pub trait LogStorage: Send + Sync {
    /// Backend name (for logging).
    fn name(&self) -> &str;

    /// Make the storage ready for writes (e.g. create the log directory).
    async fn prepare(&self) -> Result<(), StorageError>;

    /// Whether `file` already exists.
    async fn exists(&self, file: &str) -> Result<bool, StorageError>;

    /// Append `text` to `file`, creating it when missing.
    async fn append(&self, file: &str, text: &str) -> Result<(), StorageError>;

    /// Replace the contents of `file` with `text`.
    async fn overwrite(&self, file: &str, text: &str) -> Result<(), StorageError>;
}
