mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Streaming handle over an object's bytes.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// An opened object: its reader and its length at the moment it was opened.
pub struct ObjectStream {
    pub reader: ObjectReader,
    pub size: u64,
}

/// Byte-level persistence for uploaded files.
/// Keys are single path components; the metadata store decides what they mean.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key`, replacing any previous object. Returns the number of bytes stored.
    async fn put(&self, key: &str, data: Bytes) -> Result<u64, ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    async fn open(&self, key: &str) -> Result<ObjectStream, ObjectStoreError>;
    async fn rename(&self, from: &str, to: &str) -> Result<(), ObjectStoreError>;
    /// Remove an object. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
}
