//! Shared error types for the services crate.

use thiserror::Error;

use stitch_core::model::{PositionError, WorkSessionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Coarse classification callers map onto their own responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidInput,
    Conflict,
    Storage,
}

/// Errors emitted by work session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session or pattern not found")]
    NotFound,
    #[error("session belongs to another user")]
    Unauthorized,
    #[error(transparent)]
    Transition(#[from] WorkSessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<PositionError> for SessionError {
    fn from(err: PositionError) -> Self {
        Self::Transition(WorkSessionError::Position(err))
    }
}

impl SessionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound | Self::Storage(StorageError::NotFound) => ErrorKind::NotFound,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Transition(_) => ErrorKind::InvalidInput,
            Self::Storage(StorageError::Conflict) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_core::model::SessionStatus;

    #[test]
    fn kinds_follow_the_failure() {
        assert_eq!(
            SessionError::from(StorageError::NotFound).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SessionError::from(StorageError::Conflict).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            SessionError::from(WorkSessionError::NotActive {
                status: SessionStatus::Paused
            })
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(SessionError::Unauthorized.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            SessionError::from(StorageError::Connection("down".into())).kind(),
            ErrorKind::Storage
        );
    }
}
