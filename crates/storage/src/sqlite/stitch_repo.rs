use sqlx::Row;
use stitch_core::model::{Stitch, StitchId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, ser, stitch_id_from_i64};
use crate::repository::{StitchRepository, StorageError};

#[async_trait::async_trait]
impl StitchRepository for SqliteRepository {
    async fn upsert_stitch(&self, stitch: &Stitch) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO stitches (id, abbreviation, name)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                abbreviation = excluded.abbreviation,
                name = excluded.name
            ",
        )
        .bind(id_to_i64("stitch_id", stitch.id().value())?)
        .bind(stitch.abbreviation())
        .bind(stitch.name())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_stitches(&self, ids: &[StitchId]) -> Result<Vec<Stitch>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from("SELECT id, abbreviation, name FROM stitches WHERE id IN (");
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(") ORDER BY id ASC");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id_to_i64("stitch_id", id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id = stitch_id_from_i64(row.try_get("id").map_err(ser)?)?;
            let abbreviation: String = row.try_get("abbreviation").map_err(ser)?;
            let name: String = row.try_get("name").map_err(ser)?;
            out.push(Stitch::new(id, abbreviation, name).map_err(ser)?);
        }
        Ok(out)
    }
}
