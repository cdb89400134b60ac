//! file-center - A minimal file-hosting HTTP service
//!
//! This crate provides file upload, download, rename, delete, search and share links with:
//! - Optional per-file download passwords (SHA-256 digests)
//! - File bytes on the local filesystem behind a swappable object store trait
//! - redb embedded database for file records, activity log and share links
//! - REST API with multipart upload support

pub mod api;
pub mod config;
pub mod manager;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use config::Config;
use manager::FileManager;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub files: FileManager,
}
