use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::assets::AssetError;

/// ApiError
///
/// The typed error taxonomy surfaced by every mutating entry point. Each variant
/// maps to exactly one HTTP status, and the variants carrying "no side effect"
/// semantics (Validation, AccessDenied) are always raised *before* any repository
/// or asset-store write.
///
/// Non-fatal asset-removal failures are deliberately absent from this enum: they
/// are logged at WARN inside the lifecycle service and never fail the enclosing
/// operation (an orphaned asset is the accepted failure mode, not an error).
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field is missing or malformed. Raised before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The actor is not the owner of the target post/comment.
    #[error("access denied")]
    AccessDenied,

    /// The referenced post/comment/user does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unique constraint collision (duplicate username or email).
    #[error("{0} already taken")]
    Conflict(&'static str),

    /// Login failed: unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Image upload failed. Terminal for the enclosing create/update: nothing
    /// is persisted when the store call errors.
    #[error("asset store failure: {0}")]
    AssetStore(#[from] AssetError),

    /// Underlying Postgres failure. The detail is logged server-side; clients
    /// receive a generic message.
    #[error("database failure")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    /// Maps each taxonomy variant to its HTTP status and a small JSON body.
    /// Infrastructure failures are logged here so handlers never have to.
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::AccessDenied => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::AssetStore(e) => {
                tracing::error!("asset store failure: {:?}", e);
                (StatusCode::BAD_GATEWAY, "image upload failed".to_string())
            }
            ApiError::Database(e) => {
                tracing::error!("database failure: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl ApiError {
    /// from_db_unique
    ///
    /// Maps a Postgres unique-constraint violation to `Conflict`, passing every
    /// other database error through as `Database`. Used by the registration and
    /// profile-update paths where username/email carry UNIQUE indexes.
    pub fn from_db_unique(err: sqlx::Error, what: &'static str) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return ApiError::Conflict(what);
            }
        }
        ApiError::Database(err)
    }
}
