//! Typed error type for the db crate.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("row not found")]
    NotFound,

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bootstrap finished but the live schema lacks tables the service needs.
    #[error("schema initialization incomplete, missing tables: {}", .0.join(", "))]
    MissingEntities(Vec<&'static str>),

    /// Storage-level rejection raised by a non-SQL store.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A stored status string outside the known set.
    #[error("unknown request status stored in database: '{0}'")]
    InvalidStatus(String),
}

impl DbError {
    /// `true` when the storage layer rejected a write (missing parent row,
    /// duplicate unique key, NULL in a required column).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Constraint(_) => true,
            Self::Sqlx(sqlx::Error::Database(e)) => !matches!(e.kind(), sqlx::error::ErrorKind::Other),
            _ => false,
        }
    }
}
