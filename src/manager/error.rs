use thiserror::Error;

use crate::object_store::ObjectStoreError;
use crate::storage::DatabaseError;

/// Failures of file lifecycle operations.
///
/// Storage and persistence variants carry their cause for server-side logging;
/// the HTTP layer never shows it to clients.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid password")]
    Unauthorized,
    #[error("Failed to store file: {0}")]
    StorageWrite(#[source] ObjectStoreError),
    #[error("Failed to read file: {0}")]
    StorageRead(#[source] ObjectStoreError),
    #[error("Failed to delete file: {0}")]
    StorageDelete(#[source] ObjectStoreError),
    #[error("Failed to rename file: {0}")]
    StorageRename(#[source] ObjectStoreError),
    #[error("Metadata store error: {0}")]
    Persistence(#[from] DatabaseError),
    #[error("Secure random source unavailable")]
    Random,
}

impl FileError {
    pub fn validation(message: impl Into<String>) -> Self {
        FileError::Validation(message.into())
    }

    pub fn file_not_found() -> Self {
        FileError::NotFound("File not found".to_string())
    }
}
