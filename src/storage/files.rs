use chrono::Utc;
use redb::{ReadableTable, WriteTransaction};

use super::db::{next_id, Database, DatabaseError, FILE_SEQUENCE};
use super::models::FileRecord;
use super::tables::*;

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Reserve a fresh file id. Ids are never reissued, even if the reservation goes unused.
    pub fn next_file_id(&self) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let id = next_id(&write_txn, FILE_SEQUENCE)?;
        write_txn.commit()?;
        Ok(id)
    }

    /// Store a file record, replacing any record with the same id
    pub fn insert_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(file.id > 0, "file id must be reserved before insert");
        debug_assert!(
            !file.storage_path.is_empty(),
            "file storage path must not be empty"
        );

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a file by id
    pub fn get_file(&self, id: u64) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// All live files, most recently created first
    pub fn list_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        self.collect_files(|_| true)
    }

    /// Live files whose filename contains `query` (case-sensitive), ordered like `list_files`
    pub fn search_files(&self, query: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        self.collect_files(|file| file.filename.contains(query))
    }

    /// Update filename and storage path together. Returns the updated record, or `None` if absent.
    pub fn rename_file(
        &self,
        id: u64,
        filename: &str,
        storage_path: &str,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let updated = match read_file(&write_txn, id)? {
            Some(mut file) => {
                file.filename = filename.to_string();
                file.storage_path = storage_path.to_string();
                file.updated_at = Utc::now();
                write_file(&write_txn, &file)?;
                Some(file)
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Add one to a file's download counter. Returns false if the file is absent.
    pub fn increment_download_count(&self, id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let updated = match read_file(&write_txn, id)? {
            Some(mut file) => {
                file.download_count = file.download_count.saturating_add(1);
                write_file(&write_txn, &file)?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Hard-delete a file record. Activity entries and share links referencing it are kept.
    pub fn delete_file(&self, id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(FILES)?;
            let removed = table.remove(id)?;
            removed.is_some()
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    fn collect_files<F>(&self, mut keep: F) -> Result<Vec<FileRecord>, DatabaseError>
    where
        F: FnMut(&FileRecord) -> bool,
    {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut files = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let file: FileRecord = rmp_serde::from_slice(value.value())?;
            if !file.is_deleted() && keep(&file) {
                files.push(file);
            }
        }

        files.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(files)
    }
}

fn read_file(txn: &WriteTransaction, id: u64) -> Result<Option<FileRecord>, DatabaseError> {
    let table = txn.open_table(FILES)?;
    let result = match table.get(id)? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    Ok(result)
}

fn write_file(txn: &WriteTransaction, file: &FileRecord) -> Result<(), DatabaseError> {
    let data = rmp_serde::to_vec_named(file)?;
    let mut table = txn.open_table(FILES)?;
    table.insert(file.id, data.as_slice())?;
    Ok(())
}
