use crate::types::{DbId, Timestamp};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The entity is already in a state that forbids the requested transition
    /// (already active, already deprecated, tombstoned, already reviewed).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An unexpired edit lock is held by a different user.
    #[error("Locked by user {holder_user_id} until {expires_at}")]
    Locked {
        holder_user_id: DbId,
        holder_name: Option<String>,
        expires_at: Timestamp,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
