use chrono::Utc;
use redb::ReadableTable;

use super::db::{next_id, Database, DatabaseError, ACTIVITY_SEQUENCE};
use super::models::{ActivityAction, ActivityLogEntry};
use super::tables::*;

impl Database {
    // ========================================================================
    // Activity log
    // ========================================================================

    /// Append an entry to the activity log. Entries are never updated or removed.
    pub fn append_activity(
        &self,
        file_id: u64,
        action: ActivityAction,
        details: &str,
    ) -> Result<ActivityLogEntry, DatabaseError> {
        let write_txn = self.begin_write()?;
        let entry = {
            let id = next_id(&write_txn, ACTIVITY_SEQUENCE)?;
            let entry = ActivityLogEntry {
                id,
                file_id,
                action,
                details: details.to_string(),
                created_at: Utc::now(),
            };
            let data = rmp_serde::to_vec_named(&entry)?;
            let mut table = write_txn.open_table(ACTIVITY_LOG)?;
            table.insert(id, data.as_slice())?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Activity for one file, oldest first
    pub fn activity_for_file(&self, file_id: u64) -> Result<Vec<ActivityLogEntry>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ACTIVITY_LOG)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let entry: ActivityLogEntry = rmp_serde::from_slice(value.value())?;
            if entry.file_id == file_id {
                entries.push(entry);
            }
        }

        Ok(entries)
    }
}
