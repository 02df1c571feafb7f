use uuid::Uuid;

use crate::{
    assets::AssetState,
    error::ApiError,
    guard,
    models::{Comment, ImageUpload, Post, normalize_categories},
    repository::{CommentState, NewComment, NewPost, PostPatch, PostState},
};

// --- Service Inputs ---

/// CreatePostInput
///
/// Decoded, transport-independent input for post creation. The handler layer
/// has already resolved the actor and decoded any inline image by the time
/// this reaches the service.
#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub title: String,
    pub body: String,
    pub categories: Vec<String>,
    pub image: Option<ImageUpload>,
}

/// UpdatePostInput
///
/// Decoded partial patch for a post. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub body: Option<String>,
    pub categories: Option<Vec<String>>,
    pub image: Option<ImageUpload>,
}

/// PostLifecycle
///
/// Orchestrates every mutation that spans more than one collaborator: post
/// create/update/delete across the post repository, the comment repository,
/// and the asset store, plus comment create/delete (which need the post
/// repository for existence checks and the guard for ownership).
///
/// This is the only component permitted to trigger cascading effects, and the
/// only one that writes image references, so the "asset id is live whenever
/// non-null" invariant has exactly one enforcement point.
#[derive(Clone)]
pub struct PostLifecycle {
    posts: PostState,
    comments: CommentState,
    assets: AssetState,
}

impl PostLifecycle {
    pub fn new(posts: PostState, comments: CommentState, assets: AssetState) -> Self {
        Self {
            posts,
            comments,
            assets,
        }
    }

    /// create_post
    ///
    /// Validates, then — if an image is attached — uploads it *before* the
    /// repository write, so a persisted post can never reference an asset that
    /// was never stored. An upload failure aborts the create with zero rows
    /// written; an insert failure after a successful upload triggers a
    /// best-effort removal of the just-stored asset.
    pub async fn create_post(
        &self,
        author_id: Uuid,
        author_username: &str,
        input: CreatePostInput,
    ) -> Result<Post, ApiError> {
        if input.title.trim().is_empty() {
            return Err(ApiError::Validation("title is required".to_string()));
        }
        if input.body.trim().is_empty() {
            return Err(ApiError::Validation("body is required".to_string()));
        }

        let stored = match &input.image {
            Some(image) => Some(
                self.assets
                    .store(&image.bytes, &image.filename, &image.content_type)
                    .await?,
            ),
            None => None,
        };

        let new_post = NewPost {
            title: input.title,
            body: input.body,
            author_id,
            author_username: author_username.to_string(),
            categories: normalize_categories(input.categories),
            image_url: stored.as_ref().map(|s| s.url.clone()),
            image_asset_id: stored.as_ref().map(|s| s.asset_id.clone()),
        };

        match self.posts.insert_post(new_post).await {
            Ok(post) => Ok(post),
            Err(e) => {
                // The upload already happened; reclaim it so the failed create
                // leaves nothing behind. A failed reclaim just orphans the asset.
                if let Some(stored) = stored {
                    if let Err(remove_err) = self.assets.remove(&stored.asset_id).await {
                        tracing::warn!(
                            asset_id = %stored.asset_id,
                            "failed to reclaim asset after aborted create: {remove_err}"
                        );
                    }
                }
                Err(ApiError::Database(e))
            }
        }
    }

    /// update_post
    ///
    /// Guard check before any side effect. When the patch carries a new image,
    /// the upload happens first; only after it succeeds is the previous asset
    /// requested for removal (exactly once, failure logged and swallowed) and
    /// the patch persisted with the new reference.
    pub async fn update_post(
        &self,
        post_id: Uuid,
        actor_id: Uuid,
        input: UpdatePostInput,
    ) -> Result<Post, ApiError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(ApiError::NotFound("post"))?;

        guard::ensure_owner(actor_id, &post)?;

        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(ApiError::Validation("title must not be blank".to_string()));
            }
        }
        if let Some(body) = &input.body {
            if body.trim().is_empty() {
                return Err(ApiError::Validation("body must not be blank".to_string()));
            }
        }

        let new_image = match &input.image {
            Some(image) => {
                let stored = self
                    .assets
                    .store(&image.bytes, &image.filename, &image.content_type)
                    .await?;

                // New asset is live; retire the old one. Non-fatal: a stale
                // orphan asset is accepted, the post record stays correct.
                if let Some(old_asset_id) = &post.image_asset_id {
                    if let Err(remove_err) = self.assets.remove(old_asset_id).await {
                        tracing::warn!(
                            asset_id = %old_asset_id,
                            "failed to remove replaced asset: {remove_err}"
                        );
                    }
                }

                Some(stored)
            }
            None => None,
        };

        let patch = PostPatch {
            title: input.title,
            body: input.body,
            categories: input.categories.map(normalize_categories),
            image_url: new_image.as_ref().map(|s| s.url.clone()),
            image_asset_id: new_image.as_ref().map(|s| s.asset_id.clone()),
        };

        self.posts
            .update_post(post_id, patch)
            .await?
            // Row vanished between the load and the write.
            .ok_or(ApiError::NotFound("post"))
    }

    /// delete_post
    ///
    /// Guard check first. Then the two-step cascade: the post row, immediately
    /// followed by its comments with no unrelated work interleaved (the crash
    /// window between the two steps is the documented partial-failure mode).
    /// Asset removal runs last and is non-fatal.
    pub async fn delete_post(&self, post_id: Uuid, actor_id: Uuid) -> Result<(), ApiError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(ApiError::NotFound("post"))?;

        guard::ensure_owner(actor_id, &post)?;

        if !self.posts.delete_post(post_id).await? {
            return Err(ApiError::NotFound("post"));
        }
        let removed = self.comments.delete_comments_by_post(post_id).await?;
        tracing::debug!(%post_id, comments_removed = removed, "post deleted");

        if let Some(asset_id) = &post.image_asset_id {
            if let Err(remove_err) = self.assets.remove(asset_id).await {
                tracing::warn!(
                    %asset_id,
                    "failed to remove asset of deleted post: {remove_err}"
                );
            }
        }

        Ok(())
    }

    /// add_comment
    ///
    /// The parent post must resolve before anything is written; commenting on
    /// a missing post is `NotFound` with nothing persisted.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        author_username: &str,
        body: String,
    ) -> Result<Comment, ApiError> {
        if body.trim().is_empty() {
            return Err(ApiError::Validation("comment body is required".to_string()));
        }

        if self.posts.find_post(post_id).await?.is_none() {
            return Err(ApiError::NotFound("post"));
        }

        let comment = self
            .comments
            .insert_comment(NewComment {
                post_id,
                author_id,
                author_username: author_username.to_string(),
                body,
            })
            .await?;

        Ok(comment)
    }

    /// delete_comment
    ///
    /// Owner-only removal of a single comment. No cascading effects.
    pub async fn delete_comment(&self, comment_id: Uuid, actor_id: Uuid) -> Result<(), ApiError> {
        let comment = self
            .comments
            .find_comment(comment_id)
            .await?
            .ok_or(ApiError::NotFound("comment"))?;

        guard::ensure_owner(actor_id, &comment)?;

        if !self.comments.delete_comment(comment_id).await? {
            return Err(ApiError::NotFound("comment"));
        }

        Ok(())
    }
}
