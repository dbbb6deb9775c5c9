//! Service-level error types.

use thiserror::Error;

/// Errors returned by [`crate::RequestService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No request has the given id.
    #[error("request {id} not found")]
    NotFound { id: i64 },

    /// Storage failure, including constraint violations, passed through unchanged.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Database(e) if e.is_constraint_violation())
    }
}
