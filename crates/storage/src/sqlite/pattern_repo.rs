use sqlx::Row;
use stitch_core::model::{Pattern, PatternEntry, PatternGroup, PatternId};

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, index_to_i64, pattern_id_from_i64, ser, stitch_id_from_i64, u32_from_i64,
    user_id_from_i64,
};
use crate::repository::{PatternRepository, StorageError};

#[async_trait::async_trait]
impl PatternRepository for SqliteRepository {
    async fn upsert_pattern(&self, pattern: &Pattern) -> Result<(), StorageError> {
        let pattern_id = id_to_i64("pattern_id", pattern.id().value())?;
        let owner_id = id_to_i64("owner_id", pattern.owner().value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO patterns (id, owner_id, name)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                name = excluded.name
            ",
        )
        .bind(pattern_id)
        .bind(owner_id)
        .bind(pattern.name())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // Groups are replaced wholesale; entries first so the FK never dangles.
        sqlx::query("DELETE FROM pattern_entries WHERE pattern_id = ?1")
            .bind(pattern_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        sqlx::query("DELETE FROM pattern_groups WHERE pattern_id = ?1")
            .bind(pattern_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (group_pos, group) in pattern.groups().iter().enumerate() {
            let group_pos = index_to_i64("group_position", group_pos)?;
            sqlx::query(
                r"
                INSERT INTO pattern_groups (pattern_id, position, name, repeat_count)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(pattern_id)
            .bind(group_pos)
            .bind(group.name())
            .bind(i64::from(group.repeat_count()))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (entry_pos, entry) in group.entries().iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO pattern_entries (
                        pattern_id, group_position, position, stitch_id, count, repeat_count
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(pattern_id)
                .bind(group_pos)
                .bind(index_to_i64("entry_position", entry_pos)?)
                .bind(id_to_i64("stitch_id", entry.stitch_id().value())?)
                .bind(i64::from(entry.count()))
                .bind(i64::from(entry.repeat_count()))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_pattern(&self, id: PatternId) -> Result<Pattern, StorageError> {
        let pattern_id = id_to_i64("pattern_id", id.value())?;

        let row = sqlx::query("SELECT id, owner_id, name FROM patterns WHERE id = ?1")
            .bind(pattern_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        let group_rows = sqlx::query(
            r"
            SELECT position, name, repeat_count
            FROM pattern_groups
            WHERE pattern_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(pattern_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let entry_rows = sqlx::query(
            r"
            SELECT group_position, stitch_id, count, repeat_count
            FROM pattern_entries
            WHERE pattern_id = ?1
            ORDER BY group_position ASC, position ASC
            ",
        )
        .bind(pattern_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut groups = Vec::with_capacity(group_rows.len());
        for group_row in &group_rows {
            let group_pos: i64 = group_row.try_get("position").map_err(ser)?;
            let mut entries = Vec::new();
            for entry_row in &entry_rows {
                let owner: i64 = entry_row.try_get("group_position").map_err(ser)?;
                if owner != group_pos {
                    continue;
                }
                let stitch_id = stitch_id_from_i64(entry_row.try_get("stitch_id").map_err(ser)?)?;
                let count = u32_from_i64("count", entry_row.try_get("count").map_err(ser)?)?;
                let repeat_count =
                    u32_from_i64("repeat_count", entry_row.try_get("repeat_count").map_err(ser)?)?;
                entries.push(PatternEntry::new(stitch_id, count, repeat_count).map_err(ser)?);
            }

            let name: Option<String> = group_row.try_get("name").map_err(ser)?;
            let repeat_count =
                u32_from_i64("repeat_count", group_row.try_get("repeat_count").map_err(ser)?)?;
            groups.push(PatternGroup::new(name, repeat_count, entries).map_err(ser)?);
        }

        Pattern::new(
            pattern_id_from_i64(row.try_get("id").map_err(ser)?)?,
            user_id_from_i64(row.try_get("owner_id").map_err(ser)?)?,
            row.try_get::<String, _>("name").map_err(ser)?,
            groups,
        )
        .map_err(ser)
    }
}
