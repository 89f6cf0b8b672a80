use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{PatternRepository, StitchRepository, Storage, WorkSessionRepository};

mod mapping;
mod migrate;
mod pattern_repo;
mod stitch_repo;
mod work_session_repo;

/// Applied to every pooled connection. Pattern trees rely on cascading
/// deletes, so foreign keys must be on for each one.
const CONNECTION_PRAGMAS: &[&str] = &[
    "PRAGMA foreign_keys = ON;",
    "PRAGMA journal_mode = WAL;",
    "PRAGMA busy_timeout = 5000;",
];

/// Patterns, the stitch library and work sessions in one `SQLite` database.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `database_url` and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the pool cannot be opened, a connection
    /// pragma fails, or a migration fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        migrate::run_migrations(&pool).await?;
        tracing::debug!(url = database_url, "work session database ready");
        Ok(Self { pool })
    }
}

impl Storage {
    /// Build a `Storage` whose three repositories share one `SQLite` pool.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::open(database_url).await?;
        let patterns: Arc<dyn PatternRepository> = Arc::new(repo.clone());
        let stitches: Arc<dyn StitchRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn WorkSessionRepository> = Arc::new(repo);
        Ok(Self {
            patterns,
            stitches,
            sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_enforces_foreign_keys_and_records_schema() {
        let repo = SqliteRepository::open("sqlite:file:open_pragmas?mode=memory&cache=shared")
            .await
            .unwrap();

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn reopening_does_not_reapply_migrations() {
        let url = "sqlite:file:open_twice?mode=memory&cache=shared";
        let first = SqliteRepository::open(url).await.unwrap();
        let second = SqliteRepository::open(url).await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(&second.pool)
            .await
            .unwrap();
        assert_eq!(applied, 1);
        drop(first);
    }
}
