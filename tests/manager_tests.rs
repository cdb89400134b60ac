use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use file_center::manager::{FileError, FileManager};
use file_center::object_store::{
    LocalStore, ObjectReader, ObjectStore, ObjectStoreError, ObjectStream,
};
use file_center::storage::models::{ActivityAction, ActivityLogEntry, FileRecord, ShareLink};
use file_center::storage::{Database, DatabaseError, MetadataStore};
use tokio::io::AsyncReadExt;

// ============================================================================
// Fakes
// ============================================================================

fn injected() -> DatabaseError {
    DatabaseError::Io(std::io::Error::other("injected failure"))
}

/// Real database with switchable failures.
#[derive(Default)]
struct FlakyMetadata {
    db: Option<Database>,
    fail_activity: AtomicBool,
    fail_counter: AtomicBool,
    fail_delete: AtomicBool,
    fail_insert: AtomicBool,
    fail_rename: AtomicBool,
}

impl FlakyMetadata {
    fn new(db: Database) -> Self {
        Self {
            db: Some(db),
            ..Default::default()
        }
    }

    fn db(&self) -> &Database {
        self.db.as_ref().unwrap()
    }
}

impl MetadataStore for FlakyMetadata {
    fn next_file_id(&self) -> Result<u64, DatabaseError> {
        self.db().next_file_id()
    }

    fn insert_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.db().insert_file(file)
    }

    fn get_file(&self, id: u64) -> Result<Option<FileRecord>, DatabaseError> {
        self.db().get_file(id)
    }

    fn list_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        self.db().list_files()
    }

    fn search_files(&self, query: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        self.db().search_files(query)
    }

    fn rename_file(
        &self,
        id: u64,
        filename: &str,
        storage_path: &str,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        if self.fail_rename.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.db().rename_file(id, filename, storage_path)
    }

    fn increment_download_count(&self, id: u64) -> Result<bool, DatabaseError> {
        if self.fail_counter.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.db().increment_download_count(id)
    }

    fn delete_file(&self, id: u64) -> Result<bool, DatabaseError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.db().delete_file(id)
    }

    fn append_activity(
        &self,
        file_id: u64,
        action: ActivityAction,
        details: &str,
    ) -> Result<ActivityLogEntry, DatabaseError> {
        if self.fail_activity.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.db().append_activity(file_id, action, details)
    }

    fn create_share_link(&self, file_id: u64, token: &str) -> Result<ShareLink, DatabaseError> {
        self.db().create_share_link(file_id, token)
    }
}

/// Local store whose rename and delete can be made to fail.
struct FlakyObjects {
    inner: LocalStore,
    fail_delete: AtomicBool,
    fail_rename: AtomicBool,
}

fn io_failure() -> ObjectStoreError {
    ObjectStoreError::Io(std::io::Error::other("injected failure"))
}

#[async_trait]
impl ObjectStore for FlakyObjects {
    async fn put(&self, key: &str, data: Bytes) -> Result<u64, ObjectStoreError> {
        self.inner.put(key, data).await
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.inner.get(key).await
    }

    async fn open(&self, key: &str) -> Result<ObjectStream, ObjectStoreError> {
        self.inner.open(key).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), ObjectStoreError> {
        if self.fail_rename.load(Ordering::SeqCst) {
            return Err(io_failure());
        }
        self.inner.rename(from, to).await
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(io_failure());
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.inner.exists(key).await
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    db: Database,
    manager: FileManager,
    metadata: Arc<FlakyMetadata>,
    objects: Arc<FlakyObjects>,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let metadata = Arc::new(FlakyMetadata::new(db.clone()));
    let objects = Arc::new(FlakyObjects {
        inner: LocalStore::new(dir.path().join("uploads")).unwrap(),
        fail_delete: AtomicBool::new(false),
        fail_rename: AtomicBool::new(false),
    });
    let manager = FileManager::new(metadata.clone(), objects.clone());

    Harness {
        _dir: dir,
        db,
        manager,
        metadata,
        objects,
    }
}

async fn read_all(mut reader: ObjectReader) -> Vec<u8> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await.unwrap();
    buf
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_preserves_size() {
    let h = harness();

    for (name, len) in [("empty.bin", 0usize), ("one.bin", 1), ("report.pdf", 1024)] {
        let data = Bytes::from(vec![7u8; len]);
        let file = h.manager.upload(data, name, None, "127.0.0.1").await.unwrap();

        assert_eq!(file.byte_size, len as u64);
        let stored = h.objects.get(&file.storage_path).await.unwrap();
        assert_eq!(stored.len(), len);
    }
}

#[tokio::test]
async fn test_upload_returns_fresh_records_for_same_name() {
    let h = harness();

    let first = h
        .manager
        .upload(Bytes::from("first"), "same.txt", None, "a")
        .await
        .unwrap();
    let second = h
        .manager
        .upload(Bytes::from("second"), "same.txt", None, "b")
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.storage_path, second.storage_path);
    assert_eq!(
        h.objects.get(&first.storage_path).await.unwrap(),
        Bytes::from("first")
    );
    assert_eq!(
        h.objects.get(&second.storage_path).await.unwrap(),
        Bytes::from("second")
    );
}

#[tokio::test]
async fn test_upload_records_activity() {
    let h = harness();

    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "203.0.113.7")
        .await
        .unwrap();

    let entries = h.db.activity_for_file(file.id).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, ActivityAction::Upload);
    assert_eq!(entries[0].details, "203.0.113.7");
}

#[tokio::test]
async fn test_upload_survives_activity_failure() {
    let h = harness();
    h.metadata.fail_activity.store(true, Ordering::SeqCst);

    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();

    assert!(h.db.get_file(file.id).unwrap().is_some());
    assert!(h.db.activity_for_file(file.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_persistence_failure_cleans_bytes() {
    let h = harness();
    h.metadata.fail_insert.store(true, Ordering::SeqCst);

    let result = h
        .manager
        .upload(Bytes::from("x"), "lost.txt", None, "client")
        .await;

    assert!(matches!(result, Err(FileError::Persistence(_))));
    assert!(h.db.list_files().unwrap().is_empty());
    assert!(!h.objects.exists("1-lost.txt").await.unwrap());
}

#[tokio::test]
async fn test_upload_sanitizes_filename() {
    let h = harness();

    let file = h
        .manager
        .upload(Bytes::from("x"), "../../etc/passwd", None, "client")
        .await
        .unwrap();
    assert_eq!(file.filename, "passwd");

    let result = h.manager.upload(Bytes::from("x"), "", None, "client").await;
    assert!(matches!(result, Err(FileError::Validation(_))));
}

#[tokio::test]
async fn test_upload_longest_filename() {
    let h = harness();
    let name = format!("{}.txt", "a".repeat(251));
    assert_eq!(name.len(), 255);

    let file = h
        .manager
        .upload(Bytes::from("hi"), &name, None, "client")
        .await
        .unwrap();

    assert_eq!(file.filename, name);
    assert!(file.storage_path.len() <= 255);
    let download = h.manager.download(file.id, None, "client").await.unwrap();
    assert_eq!(download.file.filename, name);
    assert_eq!(read_all(download.reader).await, b"hi");
}

#[tokio::test]
async fn test_upload_empty_password_is_unprotected() {
    let h = harness();

    let file = h
        .manager
        .upload(Bytes::from("x"), "open.txt", Some(""), "client")
        .await
        .unwrap();
    assert!(!file.is_protected());
    assert!(file.password_hash.is_empty());
}

// ============================================================================
// Download
// ============================================================================

#[tokio::test]
async fn test_download_password_gate() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("classified"), "secret.txt", Some("hunter2"), "client")
        .await
        .unwrap();
    assert!(file.is_protected());

    for supplied in [None, Some(""), Some("wrong"), Some("hunter2 ")] {
        let result = h.manager.download(file.id, supplied, "client").await;
        assert!(
            matches!(result, Err(FileError::Unauthorized)),
            "password {supplied:?} should be rejected"
        );
    }

    let download = h
        .manager
        .download(file.id, Some("hunter2"), "client")
        .await
        .unwrap();
    assert_eq!(download.file.filename, "secret.txt");
    assert_eq!(read_all(download.reader).await, b"classified");
}

#[tokio::test]
async fn test_download_unprotected_ignores_password() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("public"), "open.txt", None, "client")
        .await
        .unwrap();

    for supplied in [None, Some(""), Some("anything")] {
        let download = h.manager.download(file.id, supplied, "client").await.unwrap();
        assert_eq!(read_all(download.reader).await, b"public");
    }
}

#[tokio::test]
async fn test_download_counts_and_logs() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "uploader")
        .await
        .unwrap();

    h.manager.download(file.id, None, "reader-1").await.unwrap();
    h.manager.download(file.id, None, "reader-2").await.unwrap();

    assert_eq!(h.db.get_file(file.id).unwrap().unwrap().download_count, 2);

    let downloads: Vec<String> = h
        .db
        .activity_for_file(file.id)
        .unwrap()
        .into_iter()
        .filter(|e| e.action == ActivityAction::Download)
        .map(|e| e.details)
        .collect();
    assert_eq!(downloads, vec!["reader-1", "reader-2"]);
}

#[tokio::test]
async fn test_download_unaffected_by_bookkeeping_failures() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("still served"), "a.txt", None, "client")
        .await
        .unwrap();

    h.metadata.fail_counter.store(true, Ordering::SeqCst);
    h.metadata.fail_activity.store(true, Ordering::SeqCst);

    let download = h.manager.download(file.id, None, "client").await.unwrap();
    assert_eq!(read_all(download.reader).await, b"still served");
    assert_eq!(h.db.get_file(file.id).unwrap().unwrap().download_count, 0);
}

#[tokio::test]
async fn test_download_wrong_password_not_counted() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", Some("pw"), "client")
        .await
        .unwrap();

    let _ = h.manager.download(file.id, Some("nope"), "client").await;
    assert_eq!(h.db.get_file(file.id).unwrap().unwrap().download_count, 0);
}

#[tokio::test]
async fn test_download_not_found() {
    let h = harness();
    assert!(matches!(
        h.manager.download(404, None, "client").await,
        Err(FileError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_download_missing_bytes() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();
    h.objects.inner.delete(&file.storage_path).await.unwrap();

    assert!(matches!(
        h.manager.download(file.id, None, "client").await,
        Err(FileError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_download_size_follows_stored_bytes() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("original"), "notes.txt", None, "client")
        .await
        .unwrap();
    h.objects
        .inner
        .put(&file.storage_path, Bytes::from("replaced out of band"))
        .await
        .unwrap();

    let download = h.manager.download(file.id, None, "client").await.unwrap();
    assert_eq!(download.file.byte_size, 8);
    assert_eq!(download.size, 20);
    let body = read_all(download.reader).await;
    assert_eq!(body.len() as u64, 20);
}

// ============================================================================
// Rename
// ============================================================================

#[tokio::test]
async fn test_rename_moves_bytes_and_record() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("content"), "report.pdf", None, "client")
        .await
        .unwrap();

    let renamed = h.manager.rename(file.id, "final.pdf").await.unwrap();

    assert_eq!(renamed.filename, "final.pdf");
    assert_eq!(renamed.storage_path, format!("{}-final.pdf", file.id));
    assert!(!h.objects.exists(&file.storage_path).await.unwrap());
    assert!(h.objects.exists(&renamed.storage_path).await.unwrap());

    let stored = h.db.get_file(file.id).unwrap().unwrap();
    assert_eq!(stored.filename, "final.pdf");
    assert_eq!(stored.storage_path, renamed.storage_path);

    let download = h.manager.download(file.id, None, "client").await.unwrap();
    assert_eq!(download.file.filename, "final.pdf");
    assert_eq!(read_all(download.reader).await, b"content");
}

#[tokio::test]
async fn test_rename_to_longest_filename() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("content"), "short.txt", None, "client")
        .await
        .unwrap();
    let name = format!("{}.pdf", "b".repeat(251));

    let renamed = h.manager.rename(file.id, &name).await.unwrap();

    assert_eq!(renamed.filename, name);
    assert!(renamed.storage_path.len() <= 255);
    assert!(!h.objects.exists(&file.storage_path).await.unwrap());
    assert!(h.objects.exists(&renamed.storage_path).await.unwrap());
    assert_eq!(h.db.get_file(file.id).unwrap().unwrap().filename, name);

    let download = h.manager.download(file.id, None, "client").await.unwrap();
    assert_eq!(read_all(download.reader).await, b"content");
}

#[tokio::test]
async fn test_rename_to_same_name() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "same.txt", None, "client")
        .await
        .unwrap();

    let renamed = h.manager.rename(file.id, "same.txt").await.unwrap();
    assert_eq!(renamed.storage_path, file.storage_path);
    assert!(h.objects.exists(&file.storage_path).await.unwrap());
}

#[tokio::test]
async fn test_rename_validation() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();

    for bad in ["", "  ", "../b.txt", "dir/b.txt", ".."] {
        assert!(
            matches!(
                h.manager.rename(file.id, bad).await,
                Err(FileError::Validation(_))
            ),
            "{bad:?} should be rejected"
        );
    }
    assert!(h.objects.exists(&file.storage_path).await.unwrap());

    assert!(matches!(
        h.manager.rename(999, "b.txt").await,
        Err(FileError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_rename_storage_failure_leaves_record() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();
    h.objects.fail_rename.store(true, Ordering::SeqCst);

    assert!(matches!(
        h.manager.rename(file.id, "b.txt").await,
        Err(FileError::StorageRename(_))
    ));

    let stored = h.db.get_file(file.id).unwrap().unwrap();
    assert_eq!(stored.filename, "a.txt");
    assert_eq!(stored.storage_path, file.storage_path);
}

#[tokio::test]
async fn test_rename_record_failure_restores_bytes() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();
    h.metadata.fail_rename.store(true, Ordering::SeqCst);

    assert!(matches!(
        h.manager.rename(file.id, "b.txt").await,
        Err(FileError::Persistence(_))
    ));

    assert!(h.objects.exists(&file.storage_path).await.unwrap());
    assert!(!h
        .objects
        .exists(&format!("{}-b.txt", file.id))
        .await
        .unwrap());
    assert_eq!(h.db.get_file(file.id).unwrap().unwrap().filename, "a.txt");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_removes_bytes_and_record() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();

    h.manager.delete(file.id).await.unwrap();

    assert!(!h.objects.exists(&file.storage_path).await.unwrap());
    assert!(h.db.get_file(file.id).unwrap().is_none());
    assert!(h.manager.list().unwrap().is_empty());
    assert!(matches!(
        h.manager.download(file.id, None, "client").await,
        Err(FileError::NotFound(_))
    ));
    assert!(matches!(
        h.manager.delete(file.id).await,
        Err(FileError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_storage_failure_keeps_record() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();
    h.objects.fail_delete.store(true, Ordering::SeqCst);

    assert!(matches!(
        h.manager.delete(file.id).await,
        Err(FileError::StorageDelete(_))
    ));
    assert!(h.db.get_file(file.id).unwrap().is_some());
    assert!(h.objects.exists(&file.storage_path).await.unwrap());
}

#[tokio::test]
async fn test_delete_record_failure_after_bytes_removed() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();
    h.metadata.fail_delete.store(true, Ordering::SeqCst);

    assert!(matches!(
        h.manager.delete(file.id).await,
        Err(FileError::Persistence(_))
    ));
    assert!(!h.objects.exists(&file.storage_path).await.unwrap());
}

// ============================================================================
// List, search, share
// ============================================================================

#[tokio::test]
async fn test_list_newest_first() {
    let h = harness();
    for name in ["first.txt", "second.txt", "third.txt"] {
        h.manager
            .upload(Bytes::from("x"), name, None, "client")
            .await
            .unwrap();
    }

    let names: Vec<String> = h
        .manager
        .list()
        .unwrap()
        .into_iter()
        .map(|f| f.filename)
        .collect();
    assert_eq!(names, vec!["third.txt", "second.txt", "first.txt"]);
}

#[tokio::test]
async fn test_search() {
    let h = harness();
    for name in ["report-2023.pdf", "report-2024.pdf", "photo.png"] {
        h.manager
            .upload(Bytes::from("x"), name, None, "client")
            .await
            .unwrap();
    }

    assert!(matches!(h.manager.search(""), Err(FileError::Validation(_))));

    let names: Vec<String> = h
        .manager
        .search("report")
        .unwrap()
        .into_iter()
        .map(|f| f.filename)
        .collect();
    assert_eq!(names, vec!["report-2024.pdf", "report-2023.pdf"]);

    assert_eq!(h.manager.search("2023").unwrap().len(), 1);
    assert!(h.manager.search("Report").unwrap().is_empty());
}

#[tokio::test]
async fn test_share_issues_distinct_tokens() {
    let h = harness();
    let file = h
        .manager
        .upload(Bytes::from("x"), "a.txt", None, "client")
        .await
        .unwrap();

    let first = h.manager.share(file.id, "files.example.com").unwrap();
    let second = h.manager.share(file.id, "files.example.com").unwrap();

    assert_ne!(first.link.token, second.link.token);
    assert_eq!(
        first.url,
        format!("files.example.com/api/files/share/{}", first.link.token)
    );
    assert_eq!(h.db.share_links_for_file(file.id).unwrap().len(), 2);

    assert!(matches!(
        h.manager.share(999, "files.example.com"),
        Err(FileError::NotFound(_))
    ));
}
