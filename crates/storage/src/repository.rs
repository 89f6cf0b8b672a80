use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stitch_core::model::{
    Pattern, PatternId, SessionStatus, Stitch, StitchId, UserId, WorkSession, WorkSessionDraft,
    WorkSessionId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// The row changed since it was loaded (stale `version`).
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Pattern provider. Authoring lives elsewhere; this only stores and serves
/// the group/entry tree.
#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// Persist or replace a pattern and its groups.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the pattern cannot be stored.
    async fn upsert_pattern(&self, pattern: &Pattern) -> Result<(), StorageError>;

    /// Fetch a pattern by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_pattern(&self, id: PatternId) -> Result<Pattern, StorageError>;
}

/// Stitch library access.
#[async_trait]
pub trait StitchRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the stitch cannot be stored.
    async fn upsert_stitch(&self, stitch: &Stitch) -> Result<(), StorageError>;

    /// Fetch the stitches with the given ids. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_stitches(&self, ids: &[StitchId]) -> Result<Vec<Stitch>, StorageError>;
}

/// Session store: plain CRUD over work sessions.
#[async_trait]
pub trait WorkSessionRepository: Send + Sync {
    /// Persist a new session and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn create_session(&self, draft: &WorkSessionDraft) -> Result<WorkSession, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: WorkSessionId) -> Result<WorkSession, StorageError>;

    /// Store `session` if the stored version still equals `session.version()`.
    /// Returns the session carrying its new version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` on a stale version and
    /// `StorageError::NotFound` if the session no longer exists.
    async fn update_session(&self, session: &WorkSession) -> Result<WorkSession, StorageError>;

    /// Hard-delete a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there was nothing to delete.
    async fn delete_session(&self, id: WorkSessionId) -> Result<(), StorageError>;

    /// Active and paused sessions of `owner`, most recent activity first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_active_by_user(&self, owner: UserId) -> Result<Vec<WorkSession>, StorageError>;
}

pub(crate) fn sort_by_recent_activity(sessions: &mut [WorkSession]) {
    sessions.sort_by(|a, b| {
        b.last_activity_at()
            .cmp(&a.last_activity_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
}

#[derive(Default)]
struct SessionTable {
    next_id: u64,
    rows: HashMap<WorkSessionId, WorkSession>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    patterns: Arc<Mutex<HashMap<PatternId, Pattern>>>,
    stitches: Arc<Mutex<HashMap<StitchId, Stitch>>>,
    sessions: Arc<Mutex<SessionTable>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl PatternRepository for InMemoryRepository {
    async fn upsert_pattern(&self, pattern: &Pattern) -> Result<(), StorageError> {
        let mut guard = self.patterns.lock().map_err(poisoned)?;
        guard.insert(pattern.id(), pattern.clone());
        Ok(())
    }

    async fn get_pattern(&self, id: PatternId) -> Result<Pattern, StorageError> {
        let guard = self.patterns.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl StitchRepository for InMemoryRepository {
    async fn upsert_stitch(&self, stitch: &Stitch) -> Result<(), StorageError> {
        let mut guard = self.stitches.lock().map_err(poisoned)?;
        guard.insert(stitch.id(), stitch.clone());
        Ok(())
    }

    async fn get_stitches(&self, ids: &[StitchId]) -> Result<Vec<Stitch>, StorageError> {
        let guard = self.stitches.lock().map_err(poisoned)?;
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }
}

#[async_trait]
impl WorkSessionRepository for InMemoryRepository {
    async fn create_session(&self, draft: &WorkSessionDraft) -> Result<WorkSession, StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        guard.next_id += 1;
        let session = draft.clone().into_session(WorkSessionId::new(guard.next_id));
        guard.rows.insert(session.id(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: WorkSessionId) -> Result<WorkSession, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        guard.rows.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn update_session(&self, session: &WorkSession) -> Result<WorkSession, StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        let stored = guard
            .rows
            .get_mut(&session.id())
            .ok_or(StorageError::NotFound)?;
        if stored.version() != session.version() {
            return Err(StorageError::Conflict);
        }
        *stored = session.clone().with_version(session.version() + 1);
        Ok(stored.clone())
    }

    async fn delete_session(&self, id: WorkSessionId) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        guard
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn list_active_by_user(&self, owner: UserId) -> Result<Vec<WorkSession>, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        let mut sessions: Vec<WorkSession> = guard
            .rows
            .values()
            .filter(|s| s.owner() == owner && s.status() != SessionStatus::Completed)
            .cloned()
            .collect();
        sort_by_recent_activity(&mut sessions);
        Ok(sessions)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub patterns: Arc<dyn PatternRepository>,
    pub stitches: Arc<dyn StitchRepository>,
    pub sessions: Arc<dyn WorkSessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            patterns: Arc::new(repo.clone()),
            stitches: Arc::new(repo.clone()),
            sessions: Arc::new(repo),
        }
    }
}
