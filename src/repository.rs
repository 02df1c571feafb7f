use crate::models::{Comment, Post, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// --- Insert / Patch Shapes ---

/// NewUser
///
/// Repository-level insert shape for an account. The password has already been
/// hashed by the auth layer before it reaches persistence.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// UserPatch
///
/// Partial account update. Absent fields are left untouched (COALESCE semantics).
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// NewPost
///
/// Repository-level insert shape for a post. The image reference fields are
/// populated by the lifecycle service only after a successful asset-store
/// upload, so a row never references a non-existent asset at creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
    pub author_username: String,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
    pub image_asset_id: Option<String>,
}

/// PostPatch
///
/// Partial post update. Absent fields must never clobber stored values.
/// `image_url`/`image_asset_id` are always both-Some (image replaced) or
/// both-None (image untouched); the lifecycle service maintains the pairing.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub categories: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub image_asset_id: Option<String>,
}

/// PostFilter
///
/// Read-side filter for post listings: by author and/or a case-insensitive
/// substring match on the title.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub author_id: Option<Uuid>,
    pub search: Option<String>,
}

/// NewComment
///
/// Repository-level insert shape for a comment. The lifecycle service verifies
/// the parent post exists before this ever reaches persistence.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub body: String,
}

// --- Persistence Contracts ---

/// AccountStore
///
/// Abstract contract for account persistence. Separated from the post/comment
/// repositories so the auth layer depends only on what it needs.
///
/// **Send + Sync + async_trait** are required to make the trait objects safely
/// shareable and usable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    /// Partial update; returns None when the account does not exist.
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, sqlx::Error>;
    /// Deletes the account row only. Posts and comments are deliberately left
    /// in place (orphan policy; see DESIGN.md).
    async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error>;
}

/// PostRepository
///
/// Abstract contract for post persistence. Pure row storage: ownership checks
/// and asset consistency live above this seam, in the guard and the lifecycle
/// service.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, post: NewPost) -> Result<Post, sqlx::Error>;
    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, sqlx::Error>;
    async fn find_posts(&self, filter: PostFilter) -> Result<Vec<Post>, sqlx::Error>;
    /// Partial update; returns None when the post does not exist.
    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>, sqlx::Error>;
    /// Returns true if a row was removed.
    async fn delete_post(&self, id: Uuid) -> Result<bool, sqlx::Error>;
}

/// CommentRepository
///
/// Abstract contract for comment persistence. The cascade helper
/// (`delete_comments_by_post`) exists so the lifecycle service can run the
/// post-delete saga with a single call per step.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error>;
    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, sqlx::Error>;
    async fn find_comments_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, sqlx::Error>;
    /// Returns true if a row was removed.
    async fn delete_comment(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    /// Removes every comment tied to the post; returns the number removed.
    async fn delete_comments_by_post(&self, post_id: Uuid) -> Result<u64, sqlx::Error>;
}

/// Shared trait-object handles for the application state.
pub type AccountState = Arc<dyn AccountStore>;
pub type PostState = Arc<dyn PostRepository>;
pub type CommentState = Arc<dyn CommentRepository>;

// --- Postgres Implementation ---

/// PostgresRepository
///
/// The concrete implementation of all three persistence contracts, backed by a
/// single PostgreSQL connection pool. Queries use the runtime sqlx API (bind
/// parameters throughout, no string interpolation) so the crate builds without
/// a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const POST_COLUMNS: &str = "id, title, body, author_id, author_username, categories, \
     image_url, image_asset_id, created_at, updated_at";

#[async_trait]
impl AccountStore for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, updated_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// update_user
    ///
    /// Uses the PostgreSQL `COALESCE` function to handle `Option<T>` fields,
    /// only updating a column if the corresponding patch field is `Some`.
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.username)
        .bind(patch.email)
        .bind(patch.password_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostRepository for PostgresRepository {
    async fn insert_post(&self, post: NewPost) -> Result<Post, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts
                (id, title, body, author_id, author_username, categories,
                 image_url, image_asset_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING id, title, body, author_id, author_username, categories,
                      image_url, image_asset_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post.title)
        .bind(post.body)
        .bind(post.author_id)
        .bind(post.author_username)
        .bind(post.categories)
        .bind(post.image_url)
        .bind(post.image_asset_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// find_posts
    ///
    /// Implements flexible listing using QueryBuilder for safe parameterization.
    /// The search term is matched case-insensitively against the title (ILIKE).
    async fn find_posts(&self, filter: PostFilter) -> Result<Vec<Post>, sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE TRUE "
        ));

        if let Some(author_id) = filter.author_id {
            builder.push(" AND author_id = ");
            builder.push_bind(author_id);
        }

        if let Some(search) = filter.search {
            let pattern = format!("%{}%", search);
            builder.push(" AND title ILIKE ");
            builder.push_bind(pattern);
        }

        builder.push(" ORDER BY created_at DESC");

        builder.build_query_as::<Post>().fetch_all(&self.pool).await
    }

    /// update_post
    ///
    /// COALESCE-based partial update. `author_id`/`author_username` are never
    /// touched: authorship is immutable after creation.
    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                body = COALESCE($3, body),
                categories = COALESCE($4, categories),
                image_url = COALESCE($5, image_url),
                image_asset_id = COALESCE($6, image_asset_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, body, author_id, author_username, categories,
                      image_url, image_asset_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.body)
        .bind(patch.categories)
        .bind(patch.image_url)
        .bind(patch.image_asset_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommentRepository for PostgresRepository {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments
                (id, post_id, author_id, author_username, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, post_id, author_id, author_username, body, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.author_username)
        .bind(comment.body)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, author_id, author_username, body, created_at, updated_at \
             FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_comments_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, author_id, author_username, body, created_at, updated_at \
             FROM comments WHERE post_id = $1 ORDER BY created_at ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// --- In-Memory Implementation (For Tests) ---

/// MemoryRepository
///
/// A Mutex-backed, in-memory implementation of all three persistence contracts,
/// used by the lifecycle and handler tests to exercise real create/read/update/
/// delete behavior without a database. `unwrap` on the locks is acceptable
/// here: this type never runs in production and a poisoned lock in a test
/// should fail the test.
#[derive(Default)]
pub struct MemoryRepository {
    users: Mutex<Vec<User>>,
    posts: Mutex<Vec<Post>>,
    comments: Mutex<Vec<Comment>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }
}

#[async_trait]
impl PostRepository for MemoryRepository {
    async fn insert_post(&self, post: NewPost) -> Result<Post, sqlx::Error> {
        let now = Utc::now();
        let record = Post {
            id: Uuid::new_v4(),
            title: post.title,
            body: post.body,
            author_id: post.author_id,
            author_username: post.author_username,
            categories: post.categories,
            image_url: post.image_url,
            image_asset_id: post.image_asset_id,
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
        Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn find_posts(&self, filter: PostFilter) -> Result<Vec<Post>, sqlx::Error> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| filter.author_id.is_none_or(|a| p.author_id == a))
            .filter(|p| {
                filter
                    .search
                    .as_ref()
                    .is_none_or(|s| p.title.to_lowercase().contains(&s.to_lowercase()))
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>, sqlx::Error> {
        let mut posts = self.posts.lock().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(body) = patch.body {
            post.body = body;
        }
        if let Some(categories) = patch.categories {
            post.categories = categories;
        }
        if let Some(image_url) = patch.image_url {
            post.image_url = Some(image_url);
        }
        if let Some(image_asset_id) = patch.image_asset_id {
            post.image_asset_id = Some(image_asset_id);
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() < before)
    }
}

#[async_trait]
impl CommentRepository for MemoryRepository {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error> {
        let now = Utc::now();
        let record = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_username: comment.author_username,
            body: comment.body,
            created_at: now,
            updated_at: now,
        };
        self.comments.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_comments_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
        let mut comments: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| c.id != id);
        Ok(comments.len() < before)
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> Result<u64, sqlx::Error> {
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| c.post_id != post_id);
        Ok((before - comments.len()) as u64)
    }
}
