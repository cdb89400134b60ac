use redb::TableDefinition;

/// File records: file id -> FileRecord (msgpack)
pub const FILES: TableDefinition<u64, &[u8]> = TableDefinition::new("files");

/// Append-only activity log: entry id -> ActivityLogEntry (msgpack)
pub const ACTIVITY_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("activity_log");

/// Share links: link id -> ShareLink (msgpack)
pub const SHARE_LINKS: TableDefinition<u64, &[u8]> = TableDefinition::new("share_links");

/// Token index: share token -> link id (enforces token uniqueness)
pub const SHARE_TOKENS: TableDefinition<&str, u64> = TableDefinition::new("share_tokens");

/// Id sequences: table name -> last issued id
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");
