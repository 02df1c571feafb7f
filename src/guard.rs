use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{Comment, Post},
};

/// Authored
///
/// Implemented by every entity with an owner. The guard only ever needs the
/// author id; nothing else about the entity participates in the decision.
pub trait Authored {
    fn author_id(&self) -> Uuid;
}

impl Authored for Post {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

/// can_mutate
///
/// The single authorization rule of the system: an actor may mutate an entity
/// iff they authored it. No role hierarchy, no delegation.
pub fn can_mutate(actor_id: Uuid, entity: &impl Authored) -> bool {
    actor_id == entity.author_id()
}

/// ensure_owner
///
/// Guard form of `can_mutate` for the mutating paths: rejects with
/// `AccessDenied` before the caller performs any repository or asset-store
/// write, so a failed check can never leave a partial effect behind.
pub fn ensure_owner(actor_id: Uuid, entity: &impl Authored) -> Result<(), ApiError> {
    if can_mutate(actor_id, entity) {
        Ok(())
    } else {
        Err(ApiError::AccessDenied)
    }
}
