mod activity;
pub mod db;
mod files;
pub mod models;
mod shares;
mod tables;

pub use db::{Database, DatabaseError};
pub use tables::*;

use models::{ActivityAction, ActivityLogEntry, FileRecord, ShareLink};

/// Metadata persistence used by the file lifecycle manager.
///
/// `Database` is the production implementation; tests substitute fakes to
/// exercise failure paths.
pub trait MetadataStore: Send + Sync {
    fn next_file_id(&self) -> Result<u64, DatabaseError>;
    fn insert_file(&self, file: &FileRecord) -> Result<(), DatabaseError>;
    fn get_file(&self, id: u64) -> Result<Option<FileRecord>, DatabaseError>;
    fn list_files(&self) -> Result<Vec<FileRecord>, DatabaseError>;
    fn search_files(&self, query: &str) -> Result<Vec<FileRecord>, DatabaseError>;
    fn rename_file(
        &self,
        id: u64,
        filename: &str,
        storage_path: &str,
    ) -> Result<Option<FileRecord>, DatabaseError>;
    fn increment_download_count(&self, id: u64) -> Result<bool, DatabaseError>;
    fn delete_file(&self, id: u64) -> Result<bool, DatabaseError>;
    fn append_activity(
        &self,
        file_id: u64,
        action: ActivityAction,
        details: &str,
    ) -> Result<ActivityLogEntry, DatabaseError>;
    fn create_share_link(&self, file_id: u64, token: &str) -> Result<ShareLink, DatabaseError>;
}

impl MetadataStore for Database {
    fn next_file_id(&self) -> Result<u64, DatabaseError> {
        Database::next_file_id(self)
    }

    fn insert_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        Database::insert_file(self, file)
    }

    fn get_file(&self, id: u64) -> Result<Option<FileRecord>, DatabaseError> {
        Database::get_file(self, id)
    }

    fn list_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        Database::list_files(self)
    }

    fn search_files(&self, query: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        Database::search_files(self, query)
    }

    fn rename_file(
        &self,
        id: u64,
        filename: &str,
        storage_path: &str,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        Database::rename_file(self, id, filename, storage_path)
    }

    fn increment_download_count(&self, id: u64) -> Result<bool, DatabaseError> {
        Database::increment_download_count(self, id)
    }

    fn delete_file(&self, id: u64) -> Result<bool, DatabaseError> {
        Database::delete_file(self, id)
    }

    fn append_activity(
        &self,
        file_id: u64,
        action: ActivityAction,
        details: &str,
    ) -> Result<ActivityLogEntry, DatabaseError> {
        Database::append_activity(self, file_id, action, details)
    }

    fn create_share_link(&self, file_id: u64, token: &str) -> Result<ShareLink, DatabaseError> {
        Database::create_share_link(self, file_id, token)
    }
}
