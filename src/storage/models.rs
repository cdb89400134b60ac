use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file record stored in redb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub filename: String,
    /// Object store key holding the bytes last written for this record
    pub storage_path: String,
    pub byte_size: u64,
    /// Hex SHA-256 of the download password; empty when the file is unprotected
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn is_protected(&self) -> bool {
        !self.password_hash.is_empty()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Kind of event recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Download,
    Upload,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Download => "download",
            ActivityAction::Upload => "upload",
        }
    }
}

/// Append-only audit entry. `file_id` is not checked against the files table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: u64,
    pub file_id: u64,
    pub action: ActivityAction,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

/// An issued share token for a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    pub id: u64,
    pub file_id: u64,
    pub token: String,
    pub created_at: DateTime<Utc>,
}
