use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical account record stored in the `users` table. The `password_hash`
/// field holds an argon2 PHC string and must never be serialized out to clients;
/// the `UserProfile` projection exists for that purpose.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Projects the account record into its client-safe shape.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// UserProfile
///
/// Output schema for account data. Everything in `User` except the credential hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Post
///
/// A published blog post from the `posts` table. This is the primary data
/// structure for the core lifecycle logic.
///
/// `author_username` is a denormalized snapshot taken at creation time; it is
/// not refreshed if the author later renames (documented consistency trade-off
/// that avoids a join on every read).
///
/// `image_url` and `image_asset_id` together form the optional image reference.
/// They are always set and cleared as a pair, and the asset id must point at a
/// live object in the Asset Store whenever non-null; the lifecycle service is
/// solely responsible for keeping that true.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    // Immutable after creation.
    pub author_id: Uuid,
    pub author_username: String,
    // Ordered, duplicate-free list of category labels (TEXT[] in Postgres).
    pub categories: Vec<String>,
    pub image_url: Option<String>,
    pub image_asset_id: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment record from the `comments` table, tied to exactly one post.
/// Carries the same denormalized `author_username` snapshot as `Post`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub body: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for account creation (POST /auth/register).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// LoginRequest
///
/// Input payload for credential login (POST /auth/login).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// LoginResponse
///
/// Output schema for a successful login: the signed session token plus the
/// caller's profile. How the token is carried on subsequent requests (header,
/// cookie) is the client's concern; the server only ever reads `Authorization`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// UpdateProfileRequest
///
/// Partial update payload for the account record (PUT /me). Absent fields are
/// left untouched (merge semantics).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// ImagePayload
///
/// Inline image attachment for post create/update: base64 content plus the
/// metadata the asset store needs. A `data:*;base64,` prefix is tolerated so
/// clients can pass a data URL straight through.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImagePayload {
    /// Base64-encoded image bytes (raw or data-URL form).
    pub data: String,
    /// Original filename, used to derive the stored object's extension.
    #[schema(example = "cover.png")]
    pub filename: String,
    /// MIME type recorded on the stored object.
    #[schema(example = "image/png")]
    pub content_type: String,
}

impl ImagePayload {
    /// decode
    ///
    /// Decodes the base64 content into the binary form the asset store accepts.
    /// Malformed base64 is a validation failure, reported before any side effect.
    pub fn decode(&self) -> Result<ImageUpload, ApiError> {
        let encoded = match self.data.split_once(";base64,") {
            Some((_, rest)) => rest,
            None => self.data.as_str(),
        };

        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| ApiError::Validation("image data is not valid base64".to_string()))?;

        if bytes.is_empty() {
            return Err(ApiError::Validation("image data is empty".to_string()));
        }

        Ok(ImageUpload {
            bytes,
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
        })
    }
}

/// ImageUpload
///
/// Decoded image binary handed to the lifecycle service. Internal only: never
/// serialized back out.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// CreatePostRequest
///
/// Input payload for publishing a new post (POST /posts). Title and body are
/// required; categories default to the empty list; the image is optional.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
}

/// UpdatePostRequest
///
/// Partial update payload for modifying an existing post (PUT /posts/{id}).
///
/// Uses `Option<T>` for all fields so that only provided fields are applied;
/// absent fields must never clobber stored values (merge, not replace).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
}

/// CreateCommentRequest
///
/// Input payload for posting a new comment. Comments are create/delete only;
/// there is no edit payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub body: String,
}

/// normalize_categories
///
/// Trims labels, drops blanks, and removes duplicates while preserving first
/// occurrence order, matching the "ordered set" shape of the category list.
pub fn normalize_categories(raw: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for label in raw {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !seen.iter().any(|s| s == trimmed) {
            seen.push(trimmed.to_string());
        }
    }
    seen
}
