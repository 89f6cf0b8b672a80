use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS stitches (
            id INTEGER PRIMARY KEY,
            abbreviation TEXT NOT NULL,
            name TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS patterns (
            id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS pattern_groups (
            pattern_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            name TEXT,
            repeat_count INTEGER NOT NULL CHECK (repeat_count >= 1),
            PRIMARY KEY (pattern_id, position),
            FOREIGN KEY (pattern_id) REFERENCES patterns(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS pattern_entries (
            pattern_id INTEGER NOT NULL,
            group_position INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            stitch_id INTEGER NOT NULL,
            count INTEGER NOT NULL CHECK (count >= 1),
            repeat_count INTEGER NOT NULL CHECK (repeat_count >= 1),
            PRIMARY KEY (pattern_id, group_position, position),
            FOREIGN KEY (pattern_id, group_position)
                REFERENCES pattern_groups(pattern_id, position) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS work_sessions (
            id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL,
            pattern_id INTEGER NOT NULL,
            group_index INTEGER NOT NULL CHECK (group_index >= 0),
            group_repeat INTEGER NOT NULL CHECK (group_repeat >= 0),
            entry_index INTEGER NOT NULL CHECK (entry_index >= 0),
            entry_repeat INTEGER NOT NULL CHECK (entry_repeat >= 0),
            stitch_ordinal INTEGER NOT NULL CHECK (stitch_ordinal >= 0),
            status TEXT NOT NULL CHECK (status IN ('active', 'paused', 'completed')),
            started_at TEXT NOT NULL,
            last_activity_at TEXT NOT NULL,
            completed_at TEXT,
            version INTEGER NOT NULL DEFAULT 0 CHECK (version >= 0),
            FOREIGN KEY (pattern_id) REFERENCES patterns(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_work_sessions_owner_status_activity
            ON work_sessions (owner_id, status, last_activity_at);
    ",
];

/// Runs the versioned schema migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        tracing::debug!("schema v1 already applied");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for statement in SCHEMA_V1 {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::debug!("applied schema v1");

    Ok(())
}
