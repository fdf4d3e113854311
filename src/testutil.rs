//! Shared test helpers for in-crate router tests.

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::{AuthConfig, Config, ServerConfig, StorageConfig, ThumbnailConfig};
use crate::object_store::LocalStore;
use crate::pipeline::{StagingArea, Thumbnailer, UploadPipeline};
use crate::storage::Database;
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret";

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("uploads");
    let staging_dir = temp_dir.path().join("staging");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            cors_allow_origin: "*".to_string(),
        },
        auth: AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            token_ttl_seconds: 3600,
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
            upload_tmp_dir: Some(staging_dir.to_string_lossy().to_string()),
            ..Default::default()
        },
        thumbnails: ThumbnailConfig::default(),
        max_upload_size: 1024 * 1024, // 1MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = LocalStore::new(&files_dir).expect("Failed to create test object store");
    let staging = StagingArea::new(Some(staging_dir.as_path()), config.max_upload_size)
        .expect("Failed to create staging area");

    let uploads = UploadPipeline::new(
        db.clone(),
        Arc::new(object_store),
        Some(Thumbnailer::new(
            config.thumbnails.max_width,
            config.thumbnails.max_height,
        )),
        staging,
    );

    Arc::new(AppState {
        tokens: TokenService::new(TEST_SECRET, chrono::Duration::hours(1)),
        config,
        db,
        uploads,
    })
}
