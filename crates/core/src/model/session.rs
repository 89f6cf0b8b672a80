use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{PatternId, UserId, WorkSessionId};
use crate::model::pattern::Pattern;
use crate::model::position::{Position, PositionError, Step};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkSessionError {
    #[error("pattern has no stitches to track")]
    EmptyPattern,

    #[error("session is {status}, navigation requires an active session")]
    NotActive { status: SessionStatus },

    #[error("cannot {action} a {from} session")]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },

    #[error("session belongs to pattern {expected}, got {actual}")]
    PatternMismatch {
        expected: PatternId,
        actual: PatternId,
    },

    #[error(transparent)]
    Position(#[from] PositionError),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle state of a work session. Abandoned sessions are deleted, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    /// Stable identifier used in persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown session status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            other => Err(ParseStatusError(other.to_owned())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// A validated, not-yet-persisted session at the first stitch of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSessionDraft {
    pub owner: UserId,
    pub pattern_id: PatternId,
    pub started_at: DateTime<Utc>,
}

impl WorkSessionDraft {
    /// Prepare a new session for `pattern`. Ownership is checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns `WorkSessionError::EmptyPattern` if the pattern has no stitches.
    pub fn start(
        owner: UserId,
        pattern: &Pattern,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkSessionError> {
        if pattern.total_stitches() == 0 {
            return Err(WorkSessionError::EmptyPattern);
        }
        Ok(Self {
            owner,
            pattern_id: pattern.id(),
            started_at: now,
        })
    }

    /// Attach a storage id, producing the live session.
    #[must_use]
    pub fn into_session(self, id: WorkSessionId) -> WorkSession {
        WorkSession {
            id,
            owner: self.owner,
            pattern_id: self.pattern_id,
            position: Position::start(),
            status: SessionStatus::Active,
            started_at: self.started_at,
            last_activity_at: self.started_at,
            completed_at: None,
            version: 0,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's live progress through one pattern.
///
/// Transitions never mutate in place; each returns the next value so callers
/// holding the previous one are unaffected until they persist the new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSession {
    id: WorkSessionId,
    owner: UserId,
    pattern_id: PatternId,
    position: Position,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl WorkSession {
    /// Rehydrate a session from persisted storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: WorkSessionId,
        owner: UserId,
        pattern_id: PatternId,
        position: Position,
        status: SessionStatus,
        started_at: DateTime<Utc>,
        last_activity_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        version: u64,
    ) -> Self {
        Self {
            id,
            owner,
            pattern_id,
            position,
            status,
            started_at,
            last_activity_at,
            completed_at,
            version,
        }
    }

    #[must_use]
    pub fn id(&self) -> WorkSessionId {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn pattern_id(&self) -> PatternId {
        self.pattern_id
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Optimistic concurrency token; bumped by the store on every update.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Move forward one stitch. Stepping past the last stitch completes the
    /// session and leaves the position on that last stitch.
    ///
    /// # Errors
    ///
    /// Returns `WorkSessionError::NotActive` unless the session is active, and
    /// `WorkSessionError::Position` if the stored position no longer fits `pattern`.
    pub fn advance(&self, pattern: &Pattern, at: DateTime<Utc>) -> Result<Self, WorkSessionError> {
        self.require_active(pattern)?;
        let mut next = self.touched(at);
        match self.position.advance(pattern)? {
            Step::Moved(position) => next.position = position,
            Step::Exhausted => {
                next.status = SessionStatus::Completed;
                next.completed_at = Some(at);
            }
        }
        Ok(next)
    }

    /// Move back one stitch; a no-op on the first stitch.
    ///
    /// # Errors
    ///
    /// Returns `WorkSessionError::NotActive` unless the session is active, and
    /// `WorkSessionError::Position` if the stored position no longer fits `pattern`.
    pub fn retreat(&self, pattern: &Pattern, at: DateTime<Utc>) -> Result<Self, WorkSessionError> {
        self.require_active(pattern)?;
        let mut next = self.touched(at);
        next.position = self.position.retreat(pattern)?;
        Ok(next)
    }

    /// # Errors
    ///
    /// Returns `WorkSessionError::InvalidTransition` unless the session is active.
    pub fn pause(&self, at: DateTime<Utc>) -> Result<Self, WorkSessionError> {
        match self.status {
            SessionStatus::Active => {
                let mut next = self.touched(at);
                next.status = SessionStatus::Paused;
                Ok(next)
            }
            from @ (SessionStatus::Paused | SessionStatus::Completed) => {
                Err(WorkSessionError::InvalidTransition {
                    from,
                    action: "pause",
                })
            }
        }
    }

    /// # Errors
    ///
    /// Returns `WorkSessionError::InvalidTransition` unless the session is paused.
    pub fn resume(&self, at: DateTime<Utc>) -> Result<Self, WorkSessionError> {
        match self.status {
            SessionStatus::Paused => {
                let mut next = self.touched(at);
                next.status = SessionStatus::Active;
                Ok(next)
            }
            from @ (SessionStatus::Active | SessionStatus::Completed) => {
                Err(WorkSessionError::InvalidTransition {
                    from,
                    action: "resume",
                })
            }
        }
    }

    fn require_active(&self, pattern: &Pattern) -> Result<(), WorkSessionError> {
        if pattern.id() != self.pattern_id {
            return Err(WorkSessionError::PatternMismatch {
                expected: self.pattern_id,
                actual: pattern.id(),
            });
        }
        match self.status {
            SessionStatus::Active => Ok(()),
            status @ (SessionStatus::Paused | SessionStatus::Completed) => {
                Err(WorkSessionError::NotActive { status })
            }
        }
    }

    fn touched(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.last_activity_at = at;
        next
    }
}
