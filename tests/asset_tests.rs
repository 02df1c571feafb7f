use inkpost::assets::{AssetError, AssetStore, MockAssetStore, RemovalOutcome};

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4e, 0x47];

// --- MOCK STORE CONTRACT ---

#[tokio::test]
async fn test_store_yields_url_and_distinct_asset_id() {
    let store = MockAssetStore::new();

    let stored = store.store(PNG_BYTES, "cover.png", "image/png").await.unwrap();

    assert!(stored.asset_id.starts_with("posts/"));
    assert!(stored.asset_id.ends_with(".png"));
    // The asset id is an identifier distinct from the URL, but the path-style
    // URL embeds it.
    assert_ne!(stored.url, stored.asset_id);
    assert!(stored.url.contains(&stored.asset_id));
    assert_eq!(store.live_assets(), vec![stored.asset_id]);
}

#[tokio::test]
async fn test_remove_distinguishes_missing_objects() {
    let store = MockAssetStore::new();
    let stored = store.store(PNG_BYTES, "cover.png", "image/png").await.unwrap();

    let first = store.remove(&stored.asset_id).await.unwrap();
    assert_eq!(first, RemovalOutcome::Removed);
    assert!(store.live_assets().is_empty());

    let second = store.remove(&stored.asset_id).await.unwrap();
    assert_eq!(second, RemovalOutcome::NotFound);

    // Both attempts were recorded.
    assert_eq!(store.removal_requests().len(), 2);
}

#[tokio::test]
async fn test_failure_toggles_map_to_error_variants() {
    let failing_store = MockAssetStore::failing_store();
    let err = failing_store
        .store(PNG_BYTES, "cover.png", "image/png")
        .await
        .unwrap_err();
    assert!(matches!(err, AssetError::Upload(_)));
    assert!(failing_store.live_assets().is_empty());

    let failing_remove = MockAssetStore::failing_remove();
    let err = failing_remove.remove("posts/ghost.png").await.unwrap_err();
    assert!(matches!(err, AssetError::Removal(_)));
    // Failed removals still count as requests for "exactly once" assertions.
    assert_eq!(failing_remove.removal_requests(), vec!["posts/ghost.png"]);
}

// --- OBJECT KEY DERIVATION ---

#[tokio::test]
async fn test_object_keys_sanitize_extensions() {
    let store = MockAssetStore::new();

    // Hostile extension characters are stripped down to alphanumerics.
    let stored = store
        .store(PNG_BYTES, "../../evil.p?nG", "image/png")
        .await
        .unwrap();
    assert!(stored.asset_id.ends_with(".png"));
    assert!(!stored.asset_id.contains(".."));

    // Extension-less filenames fall back to .bin.
    let stored = store.store(PNG_BYTES, "noextension", "image/png").await.unwrap();
    assert!(stored.asset_id.ends_with(".bin"));
}

#[tokio::test]
async fn test_object_keys_are_unique_per_upload() {
    let store = MockAssetStore::new();

    let first = store.store(PNG_BYTES, "cover.png", "image/png").await.unwrap();
    let second = store.store(PNG_BYTES, "cover.png", "image/png").await.unwrap();

    assert_ne!(first.asset_id, second.asset_id);
}
