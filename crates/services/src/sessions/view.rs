use chrono::{DateTime, Utc};

use stitch_core::ProgressReport;
use stitch_core::model::{PatternId, SessionStatus, WorkSession, WorkSessionId};

/// A session together with the progress report computed right after its
/// latest transition was persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkSessionView {
    pub session: WorkSession,
    pub pattern_name: String,
    pub progress: ProgressReport,
}

/// Presentation-agnostic list item for an unfinished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSessionItem {
    pub id: WorkSessionId,
    pub pattern_id: PatternId,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl ActiveSessionItem {
    #[must_use]
    pub fn from_session(session: &WorkSession) -> Self {
        Self {
            id: session.id(),
            pattern_id: session.pattern_id(),
            status: session.status(),
            started_at: session.started_at(),
            last_activity_at: session.last_activity_at(),
        }
    }
}
