use std::fmt;
use std::sync::Arc;

use stitch_core::compute_progress;
use stitch_core::model::{
    Pattern, PatternId, Stitch, UserId, WorkSession, WorkSessionDraft, WorkSessionId,
};
use storage::repository::{
    PatternRepository, StitchRepository, Storage, StorageError, WorkSessionRepository,
};
use tracing::{debug, info};

use super::view::{ActiveSessionItem, WorkSessionView};
use crate::Clock;
use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Advance,
    Retreat,
    Pause,
    Resume,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Advance => "advance",
            Self::Retreat => "retreat",
            Self::Pause => "pause",
            Self::Resume => "resume",
        })
    }
}

/// Request-level orchestration for work sessions.
///
/// Every navigation call loads the session together with its pattern and
/// stitch library, applies exactly one transition, persists it
/// (version-checked) and then computes a fresh progress report. All reads
/// happen before the write, so a failed call leaves the session as it was.
/// Nothing is retried: a `Conflict` from the store goes straight back to the caller.
#[derive(Clone)]
pub struct WorkSessionService {
    clock: Clock,
    patterns: Arc<dyn PatternRepository>,
    stitches: Arc<dyn StitchRepository>,
    sessions: Arc<dyn WorkSessionRepository>,
}

impl WorkSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        patterns: Arc<dyn PatternRepository>,
        stitches: Arc<dyn StitchRepository>,
        sessions: Arc<dyn WorkSessionRepository>,
    ) -> Self {
        Self {
            clock,
            patterns,
            stitches,
            sessions,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.patterns),
            Arc::clone(&storage.stitches),
            Arc::clone(&storage.sessions),
        )
    }

    /// Start tracking `pattern_id` for `user` at the first stitch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the pattern is missing or owned by
    /// someone else, and `SessionError::Transition` if it has no stitches.
    pub async fn start(
        &self,
        user: UserId,
        pattern_id: PatternId,
    ) -> Result<WorkSessionView, SessionError> {
        let pattern = self.load_pattern(pattern_id).await?;
        if pattern.owner() != user {
            return Err(SessionError::NotFound);
        }
        let stitches = self.load_stitches(&pattern).await?;

        let draft = WorkSessionDraft::start(user, &pattern, self.clock.now())?;
        let session = self.sessions.create_session(&draft).await?;
        info!(
            session_id = %session.id(),
            pattern_id = %pattern_id,
            total_stitches = pattern.total_stitches(),
            "work session started"
        );

        Ok(render(session, &pattern, &stitches))
    }

    /// # Errors
    ///
    /// Returns `SessionError` if the session is missing, not owned by `user`,
    /// not active, or cannot be persisted.
    pub async fn advance(
        &self,
        user: UserId,
        id: WorkSessionId,
    ) -> Result<WorkSessionView, SessionError> {
        self.apply(user, id, Action::Advance).await
    }

    /// Step back one stitch; stays put on the first stitch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session is missing, not owned by `user`,
    /// not active, or cannot be persisted.
    pub async fn retreat(
        &self,
        user: UserId,
        id: WorkSessionId,
    ) -> Result<WorkSessionView, SessionError> {
        self.apply(user, id, Action::Retreat).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::Transition` unless the session is active.
    pub async fn pause(
        &self,
        user: UserId,
        id: WorkSessionId,
    ) -> Result<WorkSessionView, SessionError> {
        self.apply(user, id, Action::Pause).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::Transition` unless the session is paused.
    pub async fn resume(
        &self,
        user: UserId,
        id: WorkSessionId,
    ) -> Result<WorkSessionView, SessionError> {
        self.apply(user, id, Action::Resume).await
    }

    /// Delete the session permanently. A second call reports `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` or `SessionError::Unauthorized`.
    pub async fn abandon(&self, user: UserId, id: WorkSessionId) -> Result<(), SessionError> {
        let session = self.load_owned(user, id).await?;
        self.sessions
            .delete_session(session.id())
            .await
            .map_err(not_found)?;
        info!(session_id = %id, status = %session.status(), "work session abandoned");
        Ok(())
    }

    /// Current progress without changing anything.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session or its pattern cannot be loaded.
    pub async fn progress(
        &self,
        user: UserId,
        id: WorkSessionId,
    ) -> Result<WorkSessionView, SessionError> {
        let session = self.load_owned(user, id).await?;
        let (pattern, stitches) = self.load_context(session.pattern_id()).await?;
        Ok(render(session, &pattern, &stitches))
    }

    /// Unfinished sessions of `user`, most recently touched first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_active(&self, user: UserId) -> Result<Vec<ActiveSessionItem>, SessionError> {
        let sessions = self.sessions.list_active_by_user(user).await?;
        Ok(sessions.iter().map(ActiveSessionItem::from_session).collect())
    }

    async fn apply(
        &self,
        user: UserId,
        id: WorkSessionId,
        action: Action,
    ) -> Result<WorkSessionView, SessionError> {
        let session = self.load_owned(user, id).await?;
        let (pattern, stitches) = self.load_context(session.pattern_id()).await?;
        let now = self.clock.now();

        let next = match action {
            Action::Advance => session.advance(&pattern, now)?,
            Action::Retreat => session.retreat(&pattern, now)?,
            Action::Pause => session.pause(now)?,
            Action::Resume => session.resume(now)?,
        };

        let stored = self.sessions.update_session(&next).await?;
        debug!(
            session_id = %id,
            %action,
            position = %stored.position(),
            status = %stored.status(),
            version = stored.version(),
            "work session updated"
        );
        if stored.is_complete() && !session.is_complete() {
            info!(session_id = %id, "work session completed");
        }

        Ok(render(stored, &pattern, &stitches))
    }

    async fn load_owned(
        &self,
        user: UserId,
        id: WorkSessionId,
    ) -> Result<WorkSession, SessionError> {
        let session = self.sessions.get_session(id).await.map_err(not_found)?;
        if session.owner() != user {
            return Err(SessionError::Unauthorized);
        }
        Ok(session)
    }

    async fn load_pattern(&self, id: PatternId) -> Result<Pattern, SessionError> {
        self.patterns.get_pattern(id).await.map_err(not_found)
    }

    async fn load_stitches(&self, pattern: &Pattern) -> Result<Vec<Stitch>, SessionError> {
        Ok(self.stitches.get_stitches(&pattern.stitch_ids()).await?)
    }

    /// Pattern plus the stitches it references, read before anything is written.
    async fn load_context(&self, id: PatternId) -> Result<(Pattern, Vec<Stitch>), SessionError> {
        let pattern = self.load_pattern(id).await?;
        let stitches = self.load_stitches(&pattern).await?;
        Ok((pattern, stitches))
    }
}

fn render(session: WorkSession, pattern: &Pattern, stitches: &[Stitch]) -> WorkSessionView {
    let progress = compute_progress(&session, pattern, stitches);
    WorkSessionView {
        session,
        pattern_name: pattern.name().to_owned(),
        progress,
    }
}

fn not_found(err: StorageError) -> SessionError {
    match err {
        StorageError::NotFound => SessionError::NotFound,
        other => SessionError::Storage(other),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
