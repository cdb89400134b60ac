use chrono::Utc;
use redb::ReadableTable;

use super::db::{next_id, Database, DatabaseError, SHARE_SEQUENCE};
use super::models::ShareLink;
use super::tables::*;

impl Database {
    // ========================================================================
    // Share links
    // ========================================================================

    /// Record a share link for a file. Fails with `DuplicateToken` if the token was issued before.
    pub fn create_share_link(&self, file_id: u64, token: &str) -> Result<ShareLink, DatabaseError> {
        let write_txn = self.begin_write()?;
        let link = {
            let mut tokens = write_txn.open_table(SHARE_TOKENS)?;
            if tokens.get(token)?.is_some() {
                // Dropping the transaction aborts it
                return Err(DatabaseError::DuplicateToken);
            }

            let id = next_id(&write_txn, SHARE_SEQUENCE)?;
            let link = ShareLink {
                id,
                file_id,
                token: token.to_string(),
                created_at: Utc::now(),
            };
            let data = rmp_serde::to_vec_named(&link)?;
            let mut table = write_txn.open_table(SHARE_LINKS)?;
            table.insert(id, data.as_slice())?;
            tokens.insert(token, id)?;
            link
        };
        write_txn.commit()?;
        Ok(link)
    }

    /// Look up a share link by its token
    pub fn get_share_link(&self, token: &str) -> Result<Option<ShareLink>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let tokens = read_txn.open_table(SHARE_TOKENS)?;

        let id = match tokens.get(token)? {
            Some(id) => id.value(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(SHARE_LINKS)?;
        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All links issued for one file, oldest first
    pub fn share_links_for_file(&self, file_id: u64) -> Result<Vec<ShareLink>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SHARE_LINKS)?;

        let mut links = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let link: ShareLink = rmp_serde::from_slice(value.value())?;
            if link.file_id == file_id {
                links.push(link);
            }
        }

        Ok(links)
    }
}
