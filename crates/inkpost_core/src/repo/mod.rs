//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//! - Translate storage constraint violations into domain errors.
//!
//! # Invariants
//! - Every write path runs inside exactly one storage transaction.
//! - UNIQUE violations surface as `RepoError::Conflict`, never as raw
//!   SQLite transport errors.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod article_repo;
pub mod associations;
pub mod taxonomy_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Domain error taxonomy shared by all repositories and services.
///
/// `Db` and `InvalidData` form the internal-error class; the remaining
/// variants are returned to callers unchanged with no retry attempt.
#[derive(Debug)]
pub enum RepoError {
    /// Referenced entity is missing or input is unusable; raised before any
    /// mutation happens.
    Validation(String),
    /// Slug/id has no matching row.
    NotFound { entity: &'static str, key: String },
    /// Uniqueness violation, or a delete blocked by live references.
    Conflict(String),
    /// Storage/transaction failure.
    Db(DbError),
    /// Persisted state failed to parse back into the domain model.
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps a SQLite constraint violation to `Conflict`, passing other errors
/// through as storage failures.
///
/// The UNIQUE index is the authoritative arbiter for slug/name races: the
/// advisory pre-checks in services cannot close the window between check and
/// insert, so the losing writer lands here.
pub(crate) fn constraint_to_conflict(
    err: rusqlite::Error,
    conflict_message: impl FnOnce() -> String,
) -> RepoError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            RepoError::Conflict(conflict_message())
        }
        other => other.into(),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
