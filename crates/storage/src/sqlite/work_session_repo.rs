use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use stitch_core::model::{
    Position, SessionStatus, UserId, WorkSession, WorkSessionDraft, WorkSessionId,
};

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, pattern_id_from_i64, ser, session_id_from_i64, u32_from_i64,
    user_id_from_i64, version_from_i64,
};
use crate::repository::{StorageError, WorkSessionRepository};

const SELECT_SESSION: &str = r"
    SELECT
        id, owner_id, pattern_id,
        group_index, group_repeat, entry_index, entry_repeat, stitch_ordinal,
        status, started_at, last_activity_at, completed_at, version
    FROM work_sessions
";

fn map_session_row(row: &SqliteRow) -> Result<WorkSession, StorageError> {
    let level = |field: &'static str| -> Result<u32, StorageError> {
        u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
    };
    let position = Position {
        group_index: level("group_index")?,
        group_repeat: level("group_repeat")?,
        entry_index: level("entry_index")?,
        entry_repeat: level("entry_repeat")?,
        stitch_ordinal: level("stitch_ordinal")?,
    };
    let status: SessionStatus = row
        .try_get::<String, _>("status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let started_at: DateTime<Utc> = row.try_get("started_at").map_err(ser)?;
    let last_activity_at: DateTime<Utc> = row.try_get("last_activity_at").map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

    Ok(WorkSession::from_persisted(
        session_id_from_i64(row.try_get("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get("owner_id").map_err(ser)?)?,
        pattern_id_from_i64(row.try_get("pattern_id").map_err(ser)?)?,
        position,
        status,
        started_at,
        last_activity_at,
        completed_at,
        version_from_i64(row.try_get("version").map_err(ser)?)?,
    ))
}

#[async_trait::async_trait]
impl WorkSessionRepository for SqliteRepository {
    async fn create_session(&self, draft: &WorkSessionDraft) -> Result<WorkSession, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO work_sessions (
                owner_id, pattern_id,
                group_index, group_repeat, entry_index, entry_repeat, stitch_ordinal,
                status, started_at, last_activity_at, completed_at, version
            )
            VALUES (?1, ?2, 0, 0, 0, 0, 0, ?3, ?4, ?4, NULL, 0)
            ",
        )
        .bind(id_to_i64("owner_id", draft.owner.value())?)
        .bind(id_to_i64("pattern_id", draft.pattern_id.value())?)
        .bind(SessionStatus::Active.as_str())
        .bind(draft.started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db)
                if db.is_foreign_key_violation() || db.message().contains("FOREIGN KEY") =>
            {
                StorageError::NotFound
            }
            other => conn(other),
        })?;

        let id = session_id_from_i64(res.last_insert_rowid())?;
        Ok(draft.clone().into_session(id))
    }

    async fn get_session(&self, id: WorkSessionId) -> Result<WorkSession, StorageError> {
        let sql = format!("{SELECT_SESSION} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("session_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_session_row(&row)
    }

    async fn update_session(&self, session: &WorkSession) -> Result<WorkSession, StorageError> {
        let id = id_to_i64("session_id", session.id().value())?;
        let version = id_to_i64("version", session.version())?;
        let position = session.position();

        let res = sqlx::query(
            r"
            UPDATE work_sessions SET
                group_index = ?1,
                group_repeat = ?2,
                entry_index = ?3,
                entry_repeat = ?4,
                stitch_ordinal = ?5,
                status = ?6,
                last_activity_at = ?7,
                completed_at = ?8,
                version = version + 1
            WHERE id = ?9 AND version = ?10
            ",
        )
        .bind(i64::from(position.group_index))
        .bind(i64::from(position.group_repeat))
        .bind(i64::from(position.entry_index))
        .bind(i64::from(position.entry_repeat))
        .bind(i64::from(position.stitch_ordinal))
        .bind(session.status().as_str())
        .bind(session.last_activity_at())
        .bind(session.completed_at())
        .bind(id)
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM work_sessions WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(conn)?
                .is_some();
            return Err(if exists {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        Ok(session.clone().with_version(session.version() + 1))
    }

    async fn delete_session(&self, id: WorkSessionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM work_sessions WHERE id = ?1")
            .bind(id_to_i64("session_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_active_by_user(&self, owner: UserId) -> Result<Vec<WorkSession>, StorageError> {
        let sql = format!(
            "{SELECT_SESSION} WHERE owner_id = ?1 AND status IN ('active', 'paused')
             ORDER BY last_activity_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("owner_id", owner.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }
}
