use inkpost::{
    MemoryRepository, MockAssetStore, PostLifecycle,
    error::ApiError,
    guard,
    models::{Comment, ImageUpload, Post},
    repository::{CommentRepository, PostFilter, PostRepository},
    service::{CreatePostInput, UpdatePostInput},
};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- TEST UTILITIES ---

const AUTHOR_ID: Uuid = Uuid::from_u128(1);
const STRANGER_ID: Uuid = Uuid::from_u128(2);

fn lifecycle_with(assets: MockAssetStore) -> (PostLifecycle, Arc<MemoryRepository>, Arc<MockAssetStore>) {
    let repo = Arc::new(MemoryRepository::new());
    let assets = Arc::new(assets);
    let lifecycle = PostLifecycle::new(repo.clone(), repo.clone(), assets.clone());
    (lifecycle, repo, assets)
}

fn sample_image() -> ImageUpload {
    ImageUpload {
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
        filename: "cover.png".to_string(),
        content_type: "image/png".to_string(),
    }
}

fn post_input(title: &str, body: &str) -> CreatePostInput {
    CreatePostInput {
        title: title.to_string(),
        body: body.to_string(),
        ..CreatePostInput::default()
    }
}

// --- OWNERSHIP GUARD ---

#[test]
async fn test_can_mutate_post_iff_author() {
    let post = Post {
        author_id: AUTHOR_ID,
        ..Post::default()
    };
    assert!(guard::can_mutate(AUTHOR_ID, &post));
    assert!(!guard::can_mutate(STRANGER_ID, &post));

    let comment = Comment {
        author_id: AUTHOR_ID,
        ..Comment::default()
    };
    assert!(guard::can_mutate(AUTHOR_ID, &comment));
    assert!(!guard::can_mutate(STRANGER_ID, &comment));
}

// --- CREATE ---

#[test]
async fn test_create_post_persists_author_snapshot() {
    let (lifecycle, _repo, _assets) = lifecycle_with(MockAssetStore::new());

    let post = lifecycle
        .create_post(AUTHOR_ID, "alice", post_input("A", "B"))
        .await
        .unwrap();

    assert_eq!(post.title, "A");
    assert_eq!(post.body, "B");
    assert_eq!(post.author_id, AUTHOR_ID);
    assert_eq!(post.author_username, "alice");
    assert_eq!(post.created_at, post.updated_at);
    assert!(post.image_url.is_none());
    assert!(post.image_asset_id.is_none());
}

#[test]
async fn test_create_post_rejects_blank_fields() {
    let (lifecycle, repo, _assets) = lifecycle_with(MockAssetStore::new());

    let err = lifecycle
        .create_post(AUTHOR_ID, "alice", post_input("   ", "body"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = lifecycle
        .create_post(AUTHOR_ID, "alice", post_input("title", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let posts = repo.find_posts(PostFilter::default()).await.unwrap();
    assert!(posts.is_empty());
}

#[test]
async fn test_create_post_with_image_references_live_asset() {
    let (lifecycle, _repo, assets) = lifecycle_with(MockAssetStore::new());

    let mut input = post_input("A", "B");
    input.image = Some(sample_image());

    let post = lifecycle
        .create_post(AUTHOR_ID, "alice", input)
        .await
        .unwrap();

    let asset_id = post.image_asset_id.expect("image asset id should be set");
    assert!(assets.live_assets().contains(&asset_id));
    assert!(post.image_url.unwrap().contains(&asset_id));
}

#[test]
async fn test_failing_upload_persists_no_post() {
    let (lifecycle, repo, _assets) = lifecycle_with(MockAssetStore::failing_store());

    let mut input = post_input("A", "B");
    input.image = Some(sample_image());

    let err = lifecycle
        .create_post(AUTHOR_ID, "alice", input)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AssetStore(_)));

    // The store failure must be atomic: zero persisted posts.
    let posts = repo.find_posts(PostFilter::default()).await.unwrap();
    assert!(posts.is_empty());
}

#[test]
async fn test_create_post_normalizes_categories() {
    let (lifecycle, _repo, _assets) = lifecycle_with(MockAssetStore::new());

    let mut input = post_input("A", "B");
    input.categories = vec![
        "Rust".to_string(),
        " Rust ".to_string(),
        "".to_string(),
        "Web".to_string(),
    ];

    let post = lifecycle
        .create_post(AUTHOR_ID, "alice", input)
        .await
        .unwrap();

    assert_eq!(post.categories, vec!["Rust".to_string(), "Web".to_string()]);
}

// --- UPDATE ---

#[test]
async fn test_partial_update_keeps_untouched_fields() {
    let (lifecycle, _repo, _assets) = lifecycle_with(MockAssetStore::new());

    let mut input = post_input("A", "B");
    input.categories = vec!["rust".to_string()];
    input.image = Some(sample_image());
    let created = lifecycle
        .create_post(AUTHOR_ID, "alice", input)
        .await
        .unwrap();

    let updated = lifecycle
        .update_post(
            created.id,
            AUTHOR_ID,
            UpdatePostInput {
                title: Some("X".to_string()),
                ..UpdatePostInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "X");
    assert_eq!(updated.body, created.body);
    assert_eq!(updated.categories, created.categories);
    assert_eq!(updated.image_url, created.image_url);
    assert_eq!(updated.image_asset_id, created.image_asset_id);
    assert!(updated.updated_at >= created.updated_at);
}

#[test]
async fn test_image_replacement_removes_previous_asset_once() {
    let (lifecycle, _repo, assets) = lifecycle_with(MockAssetStore::new());

    let mut input = post_input("A", "B");
    input.image = Some(sample_image());
    let created = lifecycle
        .create_post(AUTHOR_ID, "alice", input)
        .await
        .unwrap();
    let old_asset_id = created.image_asset_id.clone().unwrap();

    let updated = lifecycle
        .update_post(
            created.id,
            AUTHOR_ID,
            UpdatePostInput {
                image: Some(sample_image()),
                ..UpdatePostInput::default()
            },
        )
        .await
        .unwrap();

    // The previous asset id was requested for removal exactly once.
    assert_eq!(assets.removal_requests(), vec![old_asset_id.clone()]);

    let new_asset_id = updated.image_asset_id.unwrap();
    assert_ne!(new_asset_id, old_asset_id);
    assert!(assets.live_assets().contains(&new_asset_id));
    assert!(!assets.live_assets().contains(&old_asset_id));
}

#[test]
async fn test_image_replacement_survives_removal_failure() {
    let (lifecycle, _repo, assets) = lifecycle_with(MockAssetStore::failing_remove());

    let mut input = post_input("A", "B");
    input.image = Some(sample_image());
    let created = lifecycle
        .create_post(AUTHOR_ID, "alice", input)
        .await
        .unwrap();
    let old_asset_id = created.image_asset_id.clone().unwrap();

    // Removal of the old asset fails, but the update itself must commit: the
    // orphaned asset is the accepted failure mode.
    let updated = lifecycle
        .update_post(
            created.id,
            AUTHOR_ID,
            UpdatePostInput {
                image: Some(sample_image()),
                ..UpdatePostInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(assets.removal_requests(), vec![old_asset_id.clone()]);
    assert_ne!(updated.image_asset_id.unwrap(), old_asset_id);
}

#[test]
async fn test_update_by_non_owner_is_denied_without_side_effects() {
    let (lifecycle, repo, _assets) = lifecycle_with(MockAssetStore::new());

    let created = lifecycle
        .create_post(AUTHOR_ID, "u1", post_input("A", "B"))
        .await
        .unwrap();

    let err = lifecycle
        .update_post(
            created.id,
            STRANGER_ID,
            UpdatePostInput {
                title: Some("hijacked".to_string()),
                ..UpdatePostInput::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AccessDenied));

    let unchanged = repo.find_post(created.id).await.unwrap().unwrap();
    assert_eq!(unchanged.title, "A");
    assert_eq!(unchanged.body, "B");
    assert_eq!(unchanged.updated_at, created.updated_at);
}

#[test]
async fn test_update_missing_post_is_not_found() {
    let (lifecycle, _repo, _assets) = lifecycle_with(MockAssetStore::new());

    let err = lifecycle
        .update_post(Uuid::new_v4(), AUTHOR_ID, UpdatePostInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound("post")));
}

// --- DELETE / CASCADE ---

#[test]
async fn test_delete_post_cascades_to_comments_and_asset() {
    let (lifecycle, repo, assets) = lifecycle_with(MockAssetStore::new());

    let mut input = post_input("A", "B");
    input.image = Some(sample_image());
    let post = lifecycle
        .create_post(AUTHOR_ID, "alice", input)
        .await
        .unwrap();
    let asset_id = post.image_asset_id.clone().unwrap();

    let other = lifecycle
        .create_post(AUTHOR_ID, "alice", post_input("other", "post"))
        .await
        .unwrap();

    for i in 0..3 {
        lifecycle
            .add_comment(post.id, STRANGER_ID, "bob", format!("comment {i}"))
            .await
            .unwrap();
    }
    lifecycle
        .add_comment(other.id, STRANGER_ID, "bob", "unrelated".to_string())
        .await
        .unwrap();

    lifecycle.delete_post(post.id, AUTHOR_ID).await.unwrap();

    // Post absent from subsequent lookups; its comments all gone.
    assert!(repo.find_post(post.id).await.unwrap().is_none());
    assert!(repo.find_comments_by_post(post.id).await.unwrap().is_empty());

    // The unrelated post and its comment are untouched.
    assert!(repo.find_post(other.id).await.unwrap().is_some());
    assert_eq!(repo.find_comments_by_post(other.id).await.unwrap().len(), 1);

    // The post's asset was retired.
    assert_eq!(assets.removal_requests(), vec![asset_id.clone()]);
    assert!(!assets.live_assets().contains(&asset_id));
}

#[test]
async fn test_delete_post_by_non_owner_is_denied() {
    let (lifecycle, repo, _assets) = lifecycle_with(MockAssetStore::new());

    let post = lifecycle
        .create_post(AUTHOR_ID, "alice", post_input("A", "B"))
        .await
        .unwrap();

    let err = lifecycle.delete_post(post.id, STRANGER_ID).await.unwrap_err();
    assert!(matches!(err, ApiError::AccessDenied));
    assert!(repo.find_post(post.id).await.unwrap().is_some());
}

// --- COMMENTS ---

#[test]
async fn test_comment_on_missing_post_persists_nothing() {
    let (lifecycle, repo, _assets) = lifecycle_with(MockAssetStore::new());

    let ghost_post = Uuid::new_v4();
    let err = lifecycle
        .add_comment(ghost_post, STRANGER_ID, "bob", "hello".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound("post")));

    assert!(repo.find_comments_by_post(ghost_post).await.unwrap().is_empty());
}

#[test]
async fn test_comment_carries_author_snapshot() {
    let (lifecycle, _repo, _assets) = lifecycle_with(MockAssetStore::new());

    let post = lifecycle
        .create_post(AUTHOR_ID, "alice", post_input("A", "B"))
        .await
        .unwrap();

    let comment = lifecycle
        .add_comment(post.id, STRANGER_ID, "bob", "nice".to_string())
        .await
        .unwrap();

    assert_eq!(comment.post_id, post.id);
    assert_eq!(comment.author_id, STRANGER_ID);
    assert_eq!(comment.author_username, "bob");
}

#[test]
async fn test_delete_comment_owner_only() {
    let (lifecycle, repo, _assets) = lifecycle_with(MockAssetStore::new());

    let post = lifecycle
        .create_post(AUTHOR_ID, "alice", post_input("A", "B"))
        .await
        .unwrap();
    let comment = lifecycle
        .add_comment(post.id, STRANGER_ID, "bob", "mine".to_string())
        .await
        .unwrap();

    // Even the post's author may not delete someone else's comment.
    let err = lifecycle
        .delete_comment(comment.id, AUTHOR_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AccessDenied));

    lifecycle.delete_comment(comment.id, STRANGER_ID).await.unwrap();
    assert!(repo.find_comment(comment.id).await.unwrap().is_none());
}
