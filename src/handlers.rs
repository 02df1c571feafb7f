use crate::{
    AppState,
    auth::{self, AuthUser},
    error::ApiError,
    models::{
        Comment, CreateCommentRequest, CreatePostRequest, LoginRequest, LoginResponse, Post,
        RegisterRequest, UpdatePostRequest, UpdateProfileRequest, UserProfile,
    },
    repository::{NewUser, PostFilter, UserPatch},
    service::{CreatePostInput, UpdatePostInput},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// PostListQuery
///
/// Accepted query parameters for the public post listing endpoint (GET /posts).
/// `search` is matched case-insensitively against post titles; `author`
/// restricts the listing to a single author's posts.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PostListQuery {
    pub search: Option<String>,
    pub author: Option<Uuid>,
}

// --- Account Handlers ---

/// register
///
/// [Public Route] Creates a new account. The password is argon2-hashed before
/// it ever reaches persistence; duplicate usernames or emails are rejected
/// with 409. The pre-checks give friendly errors, and the unique indexes on
/// `users` back them up against racing registrations.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 409, description = "Username or email taken"),
        (status = 422, description = "Missing field")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".to_string()));
    }
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("a valid email is required".to_string()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("password is required".to_string()));
    }

    if state.users.find_user_by_email(email).await?.is_some() {
        return Err(ApiError::Conflict("email"));
    }
    if state.users.find_user_by_username(username).await?.is_some() {
        return Err(ApiError::Conflict("username"));
    }

    let user = state
        .users
        .create_user(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: auth::hash_password(&payload.password)?,
        })
        .await
        .map_err(|e| ApiError::from_db_unique(e, "username or email"))?;

    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// login
///
/// [Public Route] Verifies credentials and issues a signed session token.
/// Unknown email reports 404 (the account is absent), a wrong password 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Wrong credentials"),
        (status = 404, description = "Unknown account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .find_user_by_email(payload.email.trim())
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = auth::issue_token(&user, &state.config.jwt_secret)?;

    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}

/// get_me
///
/// [Authenticated Route] The caller's own profile, freshly resolved from the
/// account store.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .users
        .find_user_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.profile()))
}

/// update_me
///
/// [Authenticated Route] Partial profile update (username/email/password).
/// A new password is re-hashed here; absent fields stay untouched. Note that a
/// username change does NOT rewrite the denormalized author snapshots on
/// existing posts/comments — they keep the name under which they were written.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn update_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    if let Some(username) = &payload.username {
        if username.trim().is_empty() {
            return Err(ApiError::Validation("username must not be blank".to_string()));
        }
        if let Some(existing) = state.users.find_user_by_username(username.trim()).await? {
            if existing.id != id {
                return Err(ApiError::Conflict("username"));
            }
        }
    }
    if let Some(email) = &payload.email {
        if email.trim().is_empty() || !email.contains('@') {
            return Err(ApiError::Validation("a valid email is required".to_string()));
        }
        if let Some(existing) = state.users.find_user_by_email(email.trim()).await? {
            if existing.id != id {
                return Err(ApiError::Conflict("email"));
            }
        }
    }

    let password_hash = match &payload.password {
        Some(plain) if plain.is_empty() => {
            return Err(ApiError::Validation("password must not be blank".to_string()));
        }
        Some(plain) => Some(auth::hash_password(plain)?),
        None => None,
    };

    let patch = UserPatch {
        username: payload.username.map(|u| u.trim().to_string()),
        email: payload.email.map(|e| e.trim().to_string()),
        password_hash,
    };

    let user = state
        .users
        .update_user(id, patch)
        .await
        .map_err(|e| ApiError::from_db_unique(e, "username or email"))?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(user.profile()))
}

/// delete_me
///
/// [Authenticated Route] Deletes the caller's account. Their posts and
/// comments are deliberately left in place under the author-username snapshot
/// (orphan policy): no actor can ever match the deleted id again, so the
/// orphaned content becomes immutable.
#[utoipa::path(
    delete,
    path = "/me",
    responses((status = 204, description = "Account deleted"))
)]
pub async fn delete_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if state.users.delete_user(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("user"))
    }
}

// --- Post Handlers ---

/// create_post
///
/// [Authenticated Route] Publishes a new post. The author identity comes from
/// the session, never the payload; the inline image (if any) is decoded here
/// and uploaded by the lifecycle service before the row is written.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 422, description = "Missing title or body"),
        (status = 502, description = "Image upload failed")
    )
)]
pub async fn create_post(
    AuthUser { id, username }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let image = payload.image.as_ref().map(|i| i.decode()).transpose()?;

    let post = state
        .lifecycle()
        .create_post(
            id,
            &username,
            CreatePostInput {
                title: payload.title,
                body: payload.body,
                categories: payload.categories,
                image,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] Partial update of the caller's own post. The
/// Owner-Only check runs inside the lifecycle service before any side effect;
/// a non-owner gets 403 with the post untouched.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    AuthUser { id: actor_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let image = payload.image.as_ref().map(|i| i.decode()).transpose()?;

    let post = state
        .lifecycle()
        .update_post(
            post_id,
            actor_id,
            UpdatePostInput {
                title: payload.title,
                body: payload.body,
                categories: payload.categories,
                image,
            },
        )
        .await?;

    Ok(Json(post))
}

/// delete_post
///
/// [Authenticated Route] Deletes the caller's own post, cascading to its
/// comments and retiring its image asset. Success carries no content beyond
/// the status.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    AuthUser { id: actor_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.lifecycle().delete_post(post_id, actor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_posts
///
/// [Public Route] Lists posts, newest first, with optional title search
/// (case-insensitive substring) and author filter.
#[utoipa::path(
    get,
    path = "/posts",
    params(PostListQuery),
    responses((status = 200, description = "Posts", body = [Post]))
)]
pub async fn get_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state
        .posts
        .find_posts(PostFilter {
            author_id: query.author,
            search: query.search,
        })
        .await?;
    Ok(Json(posts))
}

/// get_post_details
///
/// [Public Route] Retrieves a single post by ID.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError> {
    let post = state
        .posts
        .find_post(id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}

/// get_user_posts
///
/// [Public Route] Lists every post by one author. Also works for authors whose
/// account has since been deleted (orphaned posts remain readable).
#[utoipa::path(
    get,
    path = "/users/{id}/posts",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses((status = 200, description = "Author's posts", body = [Post]))
)]
pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state
        .posts
        .find_posts(PostFilter {
            author_id: Some(author_id),
            search: None,
        })
        .await?;
    Ok(Json(posts))
}

// --- Comment Handlers ---

/// add_comment
///
/// [Authenticated Route] Posts a new comment. The parent post must exist;
/// commenting on a missing post is 404 with nothing persisted.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = Comment),
        (status = 404, description = "Post Not Found")
    )
)]
pub async fn add_comment(
    AuthUser { id, username }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state
        .lifecycle()
        .add_comment(post_id, id, &username, payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// get_comments
///
/// [Public Route] Retrieves all comments for a post, oldest first. The post
/// must exist; its comments may be an empty list.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Post Not Found")
    )
)]
pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    if state.posts.find_post(post_id).await?.is_none() {
        return Err(ApiError::NotFound("post"));
    }
    let comments = state.comments.find_comments_by_post(post_id).await?;
    Ok(Json(comments))
}

/// delete_comment
///
/// [Authenticated Route] Deletes the caller's own comment. Owner-only; no
/// cascading effects.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    AuthUser { id: actor_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.lifecycle().delete_comment(comment_id, actor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
