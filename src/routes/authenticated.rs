use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has successfully passed the
/// authentication layer: authoring and deleting posts and comments, and
/// managing one's own account.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware
/// being present on the router layer above this module. This guarantees that
/// all handlers receive a validated `AuthUser` struct containing the actor's
/// ID and username, which the ownership guard then checks on every mutating
/// post/comment operation.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Account ---
        // GET /me
        // Retrieves the currently authenticated user's profile.
        .route("/me", get(handlers::get_me))
        // PUT /me
        // Partial profile update (username, email, password).
        // DELETE /me
        // Account deletion. Posts/comments are orphaned, not cascaded.
        .route("/me", put(handlers::update_me).delete(handlers::delete_me))
        // --- Posts ---
        // POST /posts
        // Publishes a new post. An inline image is uploaded to the asset store
        // before the row is persisted.
        .route("/posts", post(handlers::create_post))
        // PUT/DELETE /posts/{id}
        // Allows the user to modify or remove their own post.
        // Strict ownership check is enforced in the lifecycle service.
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // --- Comments ---
        // POST /posts/{id}/comments
        // Posts a new comment on an existing post.
        .route("/posts/{id}/comments", post(handlers::add_comment))
        // DELETE /comments/{id}
        // Allows a user to delete their own comment. Ownership validation is required.
        .route("/comments/{id}", delete(handlers::delete_comment))
}
