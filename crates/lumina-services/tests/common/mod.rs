#![allow(dead_code)]

//! Shared fixture wiring the full service stack over in-memory backends.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use uuid::Uuid;

use lumina_cache::MemoryCache;
use lumina_core::models::{Actor, MediaAsset, UploadUrlRequest, Visibility};
use lumina_core::Config;
use lumina_index::{MemoryKvStore, MetadataStore, SearchIndex};
use lumina_services::{
    AccessController, DeletionEngine, MemoryReferenceStore, PolicyStore, RateLimiter,
    UploadService, UrlTransformService,
};
use lumina_storage::{MemoryObjectStorage, ObjectStorage};

pub struct TestApp {
    pub config: Config,
    pub storage: Arc<MemoryObjectStorage>,
    pub kv: Arc<MemoryKvStore>,
    pub cache: Arc<MemoryCache>,
    pub index: Arc<SearchIndex>,
    pub metadata: Arc<MetadataStore>,
    pub access: Arc<AccessController>,
    pub rate_limiter: Arc<RateLimiter>,
    pub references: Arc<MemoryReferenceStore>,
    pub uploads: UploadService,
    pub deletion: DeletionEngine,
    pub urls: UrlTransformService,
}

pub fn test_app() -> TestApp {
    test_app_with(Config {
        // Keep batch tests fast.
        deletion_batch_delay_ms: 1,
        ..Config::default()
    })
}

pub fn test_app_with(config: Config) -> TestApp {
    // First caller wins; later inits are a no-op.
    let _ = lumina_services::telemetry::init_telemetry();

    let storage = Arc::new(MemoryObjectStorage::new());
    let kv = Arc::new(MemoryKvStore::new());
    let cache = Arc::new(MemoryCache::new(256));
    let index = Arc::new(SearchIndex::new(kv.clone(), config.search_max_page_size));
    let metadata = Arc::new(MetadataStore::new(
        kv.clone(),
        storage.clone(),
        cache.clone(),
        index.clone(),
        config.metadata_cache_ttl_secs,
    ));
    let access = Arc::new(AccessController::new(PolicyStore::with_defaults(
        config.max_upload_size_bytes,
    )));
    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_millis(
        config.rate_limit_window_ms,
    )));
    let references = Arc::new(MemoryReferenceStore::new());
    let uploads = UploadService::new(
        storage.clone(),
        metadata.clone(),
        access.clone(),
        rate_limiter.clone(),
        config.clone(),
    );
    let deletion = DeletionEngine::new(
        storage.clone(),
        metadata.clone(),
        cache.clone(),
        references.clone(),
        access.clone(),
        rate_limiter.clone(),
        config.clone(),
    );
    let urls = UrlTransformService::new(&config).expect("url service config");

    TestApp {
        config,
        storage,
        kv,
        cache,
        index,
        metadata,
        access,
        rate_limiter,
        references,
        uploads,
        deletion,
        urls,
    }
}

pub fn user() -> Actor {
    Actor::new(Uuid::new_v4(), "user")
}

pub fn upload_request(file_name: &str, tags: &[&str], size_bytes: u64) -> UploadUrlRequest {
    UploadUrlRequest {
        file_name: file_name.to_string(),
        content_type: "image/jpeg".to_string(),
        size_bytes,
        visibility: Visibility::Public,
        tags: tags.iter().map(|s| s.to_string()).collect(),
        category: None,
    }
}

/// Run the full presign/upload/confirm flow and return the created record.
pub async fn upload_image(
    app: &TestApp,
    actor: &Actor,
    file_name: &str,
    tags: &[&str],
    size_bytes: usize,
) -> MediaAsset {
    let request = upload_request(file_name, tags, size_bytes as u64);
    let issued = app
        .uploads
        .create_upload_url(actor, &request)
        .await
        .expect("presigned URL issuance");

    // Simulate the client's direct PUT to storage.
    app.storage
        .put(
            &issued.storage_key,
            Bytes::from(vec![0u8; size_bytes]),
            &BTreeMap::new(),
        )
        .await
        .expect("direct upload");

    app.uploads
        .confirm_upload(actor, issued.id, &request, 800, 600)
        .await
        .expect("upload confirmation")
}
