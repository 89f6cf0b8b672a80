use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::sessions::WorkSessionService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    work_sessions: Arc<WorkSessionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock) -> Self {
        let work_sessions = Arc::new(WorkSessionService::from_storage(clock, &storage));
        Self {
            storage,
            work_sessions,
        }
    }

    #[must_use]
    pub fn work_sessions(&self) -> Arc<WorkSessionService> {
        Arc::clone(&self.work_sessions)
    }

    /// Raw repositories, for wiring that sits outside the session engine
    /// (seeding, pattern import).
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}
