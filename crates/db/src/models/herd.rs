use contracts::{Herd, HerdFilter, NewHerd, api::PageRequest};
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

pub const HERD_COLUMNS: &str = "id, name, location, capacity, created_at, updated_at";

/// Persistence access for [`Herd`] rows.
pub struct HerdRepository;

impl HerdRepository {
    pub async fn create<'e, E>(executor: E, id: Uuid, data: &NewHerd) -> Result<Herd, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Herd>(&format!(
            "INSERT INTO herds (id, name, location, capacity) VALUES (?, ?, ?, ?) RETURNING {HERD_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.location)
        .bind(data.capacity)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Herd>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Herd>(&format!("SELECT {HERD_COLUMNS} FROM herds WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Herd>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Herd>(&format!("SELECT {HERD_COLUMNS} FROM herds WHERE name = ?"))
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    /// Herds have no filterable fields; the filter only carries paging.
    pub async fn find_many<'e, E>(
        executor: E,
        _filter: &HerdFilter,
        page: PageRequest,
    ) -> Result<Vec<Herd>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Herd>(&format!(
            "SELECT {HERD_COLUMNS} FROM herds ORDER BY name, id LIMIT ? OFFSET ?"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(executor)
        .await
    }

    pub async fn count<'e, E>(executor: E, _filter: &HerdFilter) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM herds")
            .fetch_one(executor)
            .await
    }

    pub async fn update<'e, E>(executor: E, id: Uuid, data: &NewHerd) -> Result<Option<Herd>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Herd>(&format!(
            r#"UPDATE herds
               SET name = ?, location = ?, capacity = ?, updated_at = datetime('now', 'subsec')
               WHERE id = ?
               RETURNING {HERD_COLUMNS}"#
        ))
        .bind(&data.name)
        .bind(&data.location)
        .bind(data.capacity)
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Number of animals currently assigned to the herd.
    pub async fn head_count<'e, E>(executor: E, id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM animals WHERE herd_id = ?")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM herds WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
