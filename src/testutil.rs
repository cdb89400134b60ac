//! Shared test helpers for router tests.

use std::sync::Arc;

use crate::config::{Config, ServerConfig, StorageConfig};
use crate::manager::FileManager;
use crate::object_store::LocalStore;
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let upload_dir = temp_dir.path().join("uploads");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            cors_allowed_origins: Vec::new(),
        },
        storage: StorageConfig {
            data_dir: data_dir.to_string_lossy().to_string(),
            upload_dir: upload_dir.to_string_lossy().to_string(),
        },
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = LocalStore::new(&upload_dir).expect("Failed to create test object store");

    Arc::new(AppState {
        config,
        files: FileManager::new(Arc::new(db), Arc::new(object_store)),
    })
}
