use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in): all read paths plus the identity gateway
/// (registration and login). Every post and comment in the system is publicly
/// readable; only mutation requires a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // New account creation. The credential is hashed server-side before persistence.
        .route("/auth/register", post(handlers::register))
        // POST /auth/login
        // Credential verification; returns the signed session token plus the profile.
        .route("/auth/login", post(handlers::login))
        // GET /posts?search=...&author=...
        // Lists posts, supporting case-insensitive title search and author filtering.
        .route("/posts", get(handlers::get_posts))
        // GET /posts/{id}
        // Retrieves the detailed view of a single post.
        .route("/posts/{id}", get(handlers::get_post_details))
        // GET /posts/{id}/comments
        // Lists all comments for a post (404 when the post itself is absent).
        .route("/posts/{id}/comments", get(handlers::get_comments))
        // GET /users/{id}/posts
        // Lists every post by one author, including orphaned posts of deleted accounts.
        .route("/users/{id}/posts", get(handlers::get_user_posts))
}
