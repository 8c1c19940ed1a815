//! End-to-end upload issuance, confirmation, and metadata lifecycle.

mod common;

use common::{test_app, test_app_with, upload_image, upload_request, user};
use lumina_core::models::MediaAssetUpdate;
use lumina_core::{AppError, Config};
use lumina_storage::keys::is_user_owned;
use lumina_storage::ObjectStorage;

#[tokio::test]
async fn test_full_upload_flow_creates_canonical_record() {
    let app = test_app();
    let actor = user();

    let asset = upload_image(&app, &actor, "sunset.jpg", &["nature", "sunset"], 240_000).await;

    assert_eq!(asset.owner_id, actor.id);
    assert_eq!(asset.size_bytes, 240_000);
    assert_eq!(asset.format, "jpeg");
    assert!(is_user_owned(&asset.storage_key, actor.id));

    let loaded = app.metadata.get(asset.id).await.unwrap().unwrap();
    assert_eq!(loaded.tags, asset.tags);
}

#[tokio::test]
async fn test_confirm_without_uploaded_object_fails() {
    let app = test_app();
    let actor = user();
    let request = upload_request("ghost.jpg", &[], 1024);

    let issued = app
        .uploads
        .create_upload_url(&actor, &request)
        .await
        .unwrap();

    // The client never PUT the bytes.
    let result = app
        .uploads
        .confirm_upload(&actor, issued.id, &request, 800, 600)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_presign_rejects_invalid_request() {
    let app = test_app();
    let actor = user();

    let mut request = upload_request("pic.jpg", &[], 1024);
    request.file_name = String::new();
    assert!(matches!(
        app.uploads.create_upload_url(&actor, &request).await,
        Err(AppError::Validation(_))
    ));

    let request = upload_request("pic.jpg", &["bad tag!"], 1024);
    assert!(matches!(
        app.uploads.create_upload_url(&actor, &request).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_presign_rejects_oversized_upload() {
    let app = test_app();
    let actor = user();
    let request = upload_request("huge.jpg", &[], app.config.max_upload_size_bytes + 1);

    let result = app.uploads.create_upload_url(&actor, &request).await;
    assert!(matches!(result, Err(AppError::Authorization(_))));
}

#[tokio::test]
async fn test_upload_rate_limit_enforced_with_retry_hint() {
    let app = test_app_with(Config {
        upload_rate_limit: 2,
        deletion_batch_delay_ms: 1,
        ..Config::default()
    });
    let actor = user();

    for i in 0..2 {
        let request = upload_request(&format!("pic{}.jpg", i), &[], 1024);
        app.uploads
            .create_upload_url(&actor, &request)
            .await
            .unwrap();
    }

    let request = upload_request("pic2.jpg", &[], 1024);
    match app.uploads.create_upload_url(&actor, &request).await {
        Err(AppError::RateLimited { retry_after_secs }) => assert!(retry_after_secs >= 1),
        other => panic!("expected rate limit, got {:?}", other.map(|r| r.id)),
    }
}

#[tokio::test]
async fn test_metadata_update_after_upload() {
    let app = test_app();
    let actor = user();
    let asset = upload_image(&app, &actor, "pic.jpg", &["nature"], 50_000).await;

    let update = MediaAssetUpdate {
        category: Some("landscape".to_string()),
        ..MediaAssetUpdate::default()
    };
    let updated = app.metadata.update(asset.id, &update).await.unwrap();
    assert_eq!(updated.category.as_deref(), Some("landscape"));
    assert!(updated.updated_at >= asset.updated_at);
}

#[tokio::test]
async fn test_confirmed_upload_mirrors_headers_on_object() {
    let app = test_app();
    let actor = user();
    let asset = upload_image(&app, &actor, "pic.jpg", &[], 50_000).await;

    let info = app.storage.head(&asset.storage_key).await.unwrap();
    assert_eq!(
        info.headers.get("x-lumina-owner-id"),
        Some(&actor.id.to_string())
    );
}
