//! File lifecycle: keeps stored bytes, file records, activity and share links consistent.
//!
//! Every operation performs its object store effect and its metadata effect
//! in sequence without a shared transaction. The orderings below bound what a
//! partial failure can leave behind:
//! - upload writes bytes first; if the record cannot be saved the bytes are
//!   removed on a best-effort basis and may remain orphaned
//! - delete removes bytes first; if the record cannot be removed afterwards it
//!   points at bytes that no longer exist
//! - rename moves bytes first and moves them back if the record update fails
//!
//! Requests touching the same file are not serialized against each other.

mod error;
pub mod naming;
pub mod secrets;

pub use error::FileError;

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use ring::rand::SystemRandom;

use crate::object_store::{ObjectReader, ObjectStore, ObjectStoreError};
use crate::storage::models::{ActivityAction, FileRecord, ShareLink};
use crate::storage::{DatabaseError, MetadataStore};

/// Path under which share URLs embed their token.
pub const SHARE_PATH: &str = "/api/files/share";

const SHARE_TOKEN_ATTEMPTS: usize = 3;

/// An authorized download: the record as it was looked up plus a reader over its bytes.
/// `size` is the length of the bytes actually opened, which is what the reader yields.
pub struct Download {
    pub file: FileRecord,
    pub reader: ObjectReader,
    pub size: u64,
}

/// A newly recorded share link together with its public URL.
#[derive(Debug, Clone)]
pub struct IssuedShare {
    pub link: ShareLink,
    pub url: String,
}

pub struct FileManager {
    metadata: Arc<dyn MetadataStore>,
    objects: Arc<dyn ObjectStore>,
    rng: SystemRandom,
}

impl FileManager {
    pub fn new(metadata: Arc<dyn MetadataStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            metadata,
            objects,
            rng: SystemRandom::new(),
        }
    }

    /// Store a new file. An empty or absent password leaves the file unprotected.
    pub async fn upload(
        &self,
        data: Bytes,
        original_filename: &str,
        password: Option<&str>,
        origin: &str,
    ) -> Result<FileRecord, FileError> {
        let filename = naming::sanitize_upload_filename(original_filename)?;

        let id = self.metadata.next_file_id()?;
        let storage_path = naming::storage_key(id, &filename);

        let byte_size = self
            .objects
            .put(&storage_path, data)
            .await
            .map_err(FileError::StorageWrite)?;

        let password_hash = match password {
            Some(p) if !p.is_empty() => secrets::hash_password(p),
            _ => String::new(),
        };

        let now = Utc::now();
        let file = FileRecord {
            id,
            filename,
            storage_path,
            byte_size,
            password_hash,
            download_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        if let Err(e) = self.metadata.insert_file(&file) {
            tracing::error!(file_id = id, error = %e, "Failed to save file record");
            if let Err(cleanup) = self.objects.delete(&file.storage_path).await {
                tracing::warn!(
                    file_id = id,
                    storage_path = %file.storage_path,
                    error = %cleanup,
                    "Stored bytes left orphaned"
                );
            }
            return Err(e.into());
        }

        self.record_activity(id, ActivityAction::Upload, origin);

        tracing::debug!(file_id = id, size = byte_size, "Uploaded file");
        Ok(file)
    }

    /// Authorize and open a file for download.
    ///
    /// The download counter and activity log are updated once the bytes are
    /// open; failures there are logged and never reach the caller.
    pub async fn download(
        &self,
        id: u64,
        password: Option<&str>,
        origin: &str,
    ) -> Result<Download, FileError> {
        let file = self.find(id)?;

        if file.is_protected()
            && !secrets::verify_password(password.unwrap_or_default(), &file.password_hash)
        {
            return Err(FileError::Unauthorized);
        }

        let stream = self
            .objects
            .open(&file.storage_path)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound(_) => {
                    FileError::NotFound("File content not found".to_string())
                }
                other => FileError::StorageRead(other),
            })?;

        match self.metadata.increment_download_count(id) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(file_id = id, "File record vanished before download count update")
            }
            Err(e) => tracing::warn!(file_id = id, error = %e, "Failed to update download count"),
        }
        self.record_activity(id, ActivityAction::Download, origin);

        if stream.size != file.byte_size {
            tracing::warn!(
                file_id = id,
                recorded = file.byte_size,
                actual = stream.size,
                "Stored size differs from recorded size"
            );
        }

        tracing::debug!(file_id = id, "Serving download");
        Ok(Download {
            file,
            reader: stream.reader,
            size: stream.size,
        })
    }

    /// Remove a file's bytes, then its record.
    pub async fn delete(&self, id: u64) -> Result<FileRecord, FileError> {
        let file = self.find(id)?;

        self.objects
            .delete(&file.storage_path)
            .await
            .map_err(FileError::StorageDelete)?;

        if let Err(e) = self.metadata.delete_file(id) {
            tracing::error!(
                file_id = id,
                error = %e,
                "File bytes removed but record could not be deleted"
            );
            return Err(e.into());
        }

        tracing::debug!(file_id = id, "Deleted file");
        Ok(file)
    }

    /// Rename a file, moving its bytes and updating filename and storage path together.
    pub async fn rename(&self, id: u64, new_filename: &str) -> Result<FileRecord, FileError> {
        let file = self.find(id)?;
        let new_filename = naming::validate_new_filename(new_filename)?;
        let new_path = naming::storage_key(id, new_filename);

        let moved = new_path != file.storage_path;
        if moved {
            self.objects
                .rename(&file.storage_path, &new_path)
                .await
                .map_err(FileError::StorageRename)?;
        }

        let result = self.metadata.rename_file(id, new_filename, &new_path);
        let failure = match result {
            Ok(Some(updated)) => {
                tracing::debug!(file_id = id, filename = %updated.filename, "Renamed file");
                return Ok(updated);
            }
            Ok(None) => FileError::file_not_found(),
            Err(e) => {
                tracing::error!(file_id = id, error = %e, "Failed to update renamed file record");
                FileError::Persistence(e)
            }
        };

        if moved {
            if let Err(e) = self.objects.rename(&new_path, &file.storage_path).await {
                tracing::error!(
                    file_id = id,
                    storage_path = %new_path,
                    error = %e,
                    "Failed to restore file after rename failure"
                );
            }
        }
        Err(failure)
    }

    /// All files, most recently created first.
    pub fn list(&self) -> Result<Vec<FileRecord>, FileError> {
        Ok(self.metadata.list_files()?)
    }

    /// Files whose name contains `query` (case-sensitive), most recently created first.
    pub fn search(&self, query: &str) -> Result<Vec<FileRecord>, FileError> {
        if query.is_empty() {
            return Err(FileError::validation("search query must not be empty"));
        }
        Ok(self.metadata.search_files(query)?)
    }

    /// Issue a new share link for a file. `host` is the authority the URL is built on.
    ///
    /// Tokens are recorded but nothing resolves them yet.
    pub fn share(&self, id: u64, host: &str) -> Result<IssuedShare, FileError> {
        let file = self.find(id)?;

        for _ in 0..SHARE_TOKEN_ATTEMPTS {
            let token =
                secrets::generate_share_token(&self.rng).map_err(|_| FileError::Random)?;
            match self.metadata.create_share_link(file.id, &token) {
                Ok(link) => {
                    let url = format!("{host}{SHARE_PATH}/{}", link.token);
                    tracing::debug!(file_id = id, share_id = link.id, "Issued share link");
                    return Ok(IssuedShare { link, url });
                }
                Err(DatabaseError::DuplicateToken) => {
                    tracing::warn!(file_id = id, "Share token collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DatabaseError::DuplicateToken.into())
    }

    fn find(&self, id: u64) -> Result<FileRecord, FileError> {
        self.metadata
            .get_file(id)?
            .ok_or_else(FileError::file_not_found)
    }

    fn record_activity(&self, file_id: u64, action: ActivityAction, details: &str) {
        if let Err(e) = self.metadata.append_activity(file_id, action, details) {
            tracing::warn!(
                file_id,
                action = action.as_str(),
                error = %e,
                "Failed to append activity log entry"
            );
        }
    }
}
