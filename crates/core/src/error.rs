//! Error types for the rolelog domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The transcript pipeline
//! itself never fails; errors only come from intake and persistence.

use thiserror::Error;

/// The top-level error type for all rolelog operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Intake ---
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // --- Persistence ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Write to {file} failed: {reason}")]
    WriteFailed { file: String, reason: String },

    #[error("Read of {file} failed: {reason}")]
    ReadFailed { file: String, reason: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
