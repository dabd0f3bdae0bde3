use contracts::{Animal, AnimalFilter, NewAnimal, api::PageRequest};
use sqlx::{Executor, QueryBuilder, Sqlite};
use uuid::Uuid;

pub const ANIMAL_COLUMNS: &str =
    "id, name, kind, tag, breed, birth_date, weight_kg, herd_id, created_at, updated_at";

/// Persistence access for [`Animal`] rows.
pub struct AnimalRepository;

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &AnimalFilter) {
    if let Some(kind) = &filter.kind {
        query.push(" AND kind = ").push_bind(kind.clone());
    }
    if let Some(herd_id) = filter.herd_id {
        query.push(" AND herd_id = ").push_bind(herd_id);
    }
}

impl AnimalRepository {
    pub async fn create<'e, E>(executor: E, id: Uuid, data: &NewAnimal) -> Result<Animal, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Animal>(&format!(
            r#"INSERT INTO animals (id, name, kind, tag, breed, birth_date, weight_kg, herd_id)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING {ANIMAL_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.kind)
        .bind(&data.tag)
        .bind(&data.breed)
        .bind(data.birth_date)
        .bind(data.weight_kg)
        .bind(data.herd_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Animal>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Animal>(&format!(
            "SELECT {ANIMAL_COLUMNS} FROM animals WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_tag<'e, E>(executor: E, tag: &str) -> Result<Option<Animal>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Animal>(&format!(
            "SELECT {ANIMAL_COLUMNS} FROM animals WHERE tag = ?"
        ))
        .bind(tag)
        .fetch_optional(executor)
        .await
    }

    /// Ids out of `ids` that have a row.
    pub async fn existing_ids<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM animals WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        query.build_query_scalar::<Uuid>().fetch_all(executor).await
    }

    pub async fn find_many<'e, E>(
        executor: E,
        filter: &AnimalFilter,
        page: PageRequest,
    ) -> Result<Vec<Animal>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {ANIMAL_COLUMNS} FROM animals WHERE 1 = 1"));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY name, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        query.build_query_as::<Animal>().fetch_all(executor).await
    }

    pub async fn count<'e, E>(executor: E, filter: &AnimalFilter) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM animals WHERE 1 = 1");
        push_filter(&mut query, filter);
        query.build_query_scalar::<i64>().fetch_one(executor).await
    }

    /// Replaces every schema field. Returns `None` when no row has `id`.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &NewAnimal,
    ) -> Result<Option<Animal>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Animal>(&format!(
            r#"UPDATE animals
               SET name = ?, kind = ?, tag = ?, breed = ?, birth_date = ?, weight_kg = ?, herd_id = ?,
                   updated_at = datetime('now', 'subsec')
               WHERE id = ?
               RETURNING {ANIMAL_COLUMNS}"#
        ))
        .bind(&data.name)
        .bind(&data.kind)
        .bind(&data.tag)
        .bind(&data.breed)
        .bind(data.birth_date)
        .bind(data.weight_kg)
        .bind(data.herd_id)
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn set_herd<'e, E>(executor: E, id: Uuid, herd_id: Option<Uuid>) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE animals SET herd_id = ?, updated_at = datetime('now', 'subsec') WHERE id = ?",
        )
        .bind(herd_id)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Detaches every animal from `herd_id`.
    pub async fn clear_herd<'e, E>(executor: E, herd_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE animals SET herd_id = NULL, updated_at = datetime('now', 'subsec') WHERE herd_id = ?",
        )
        .bind(herd_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Head count per animal type within one herd, ordered by type.
    pub async fn count_by_kind<'e, E>(executor: E, herd_id: Uuid) -> Result<Vec<(String, i64)>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT kind, COUNT(*) FROM animals WHERE herd_id = ? GROUP BY kind ORDER BY kind",
        )
        .bind(herd_id)
        .fetch_all(executor)
        .await
    }

    pub async fn total_weight<'e, E>(executor: E, herd_id: Uuid) -> Result<f64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, f64>(
            "SELECT CAST(COALESCE(SUM(weight_kg), 0) AS REAL) FROM animals WHERE herd_id = ?",
        )
        .bind(herd_id)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM animals WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use contracts::{ANIMAL_SCHEMA, NewHerd};

    use super::*;
    use crate::{DBService, models::herd::HerdRepository};

    fn new_animal(name: &str, kind: &str, tag: Option<&str>) -> NewAnimal {
        NewAnimal {
            name: name.to_string(),
            kind: kind.to_string(),
            tag: tag.map(str::to_string),
            breed: None,
            birth_date: None,
            weight_kg: Some(100.0),
            herd_id: None,
        }
    }

    fn first_page() -> PageRequest {
        PageRequest::resolve(None, None).unwrap()
    }

    #[tokio::test]
    async fn test_table_columns_match_schema() {
        let db = DBService::in_memory().await.unwrap();
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('animals') ORDER BY cid")
                .fetch_all(&db.pool)
                .await
                .unwrap();
        assert_eq!(columns, ANIMAL_SCHEMA.columns());
        assert_eq!(ANIMAL_COLUMNS.split(", ").collect::<Vec<_>>(), ANIMAL_SCHEMA.columns());
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let db = DBService::in_memory().await.unwrap();
        let id = Uuid::new_v4();
        let created = AnimalRepository::create(&db.pool, id, &new_animal("Bessy", "cow", Some("A1")))
            .await
            .unwrap();
        assert_eq!(created.id, id);
        assert_eq!(created.weight_kg, Some(100.0));

        let found = AnimalRepository::find_by_id(&db.pool, id).await.unwrap().unwrap();
        assert_eq!(found, created);
        let by_tag = AnimalRepository::find_by_tag(&db.pool, "A1").await.unwrap();
        assert_eq!(by_tag.map(|a| a.id), Some(id));
        assert!(AnimalRepository::find_by_id(&db.pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_tag_is_enforced_by_store() {
        let db = DBService::in_memory().await.unwrap();
        AnimalRepository::create(&db.pool, Uuid::new_v4(), &new_animal("A", "cow", Some("T")))
            .await
            .unwrap();
        let err = AnimalRepository::create(&db.pool, Uuid::new_v4(), &new_animal("B", "cow", Some("T")))
            .await
            .unwrap_err();
        let db_err = err.as_database_error().unwrap();
        assert!(db_err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_filter_and_paging() {
        let db = DBService::in_memory().await.unwrap();
        for (name, kind) in [("Ada", "goat"), ("Bo", "cow"), ("Cy", "goat"), ("Di", "goat")] {
            AnimalRepository::create(&db.pool, Uuid::new_v4(), &new_animal(name, kind, None))
                .await
                .unwrap();
        }
        let goats = AnimalFilter {
            kind: Some("goat".to_string()),
            ..Default::default()
        };
        assert_eq!(AnimalRepository::count(&db.pool, &goats).await.unwrap(), 3);

        let page = PageRequest::resolve(Some(2), Some(2)).unwrap();
        let second = AnimalRepository::find_many(&db.pool, &goats, page).await.unwrap();
        assert_eq!(second.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["Di"]);

        let all = AnimalRepository::find_many(&db.pool, &AnimalFilter::default(), first_page())
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_update_missing_row_returns_none() {
        let db = DBService::in_memory().await.unwrap();
        let updated = AnimalRepository::update(&db.pool, Uuid::new_v4(), &new_animal("X", "pig", None))
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_herd_membership_queries() {
        let db = DBService::in_memory().await.unwrap();
        let herd_id = Uuid::new_v4();
        HerdRepository::create(
            &db.pool,
            herd_id,
            &NewHerd {
                name: "North".to_string(),
                location: None,
                capacity: None,
            },
        )
        .await
        .unwrap();

        let mut ids = Vec::new();
        for (name, kind) in [("A", "cow"), ("B", "cow"), ("C", "sheep")] {
            let id = Uuid::new_v4();
            AnimalRepository::create(&db.pool, id, &new_animal(name, kind, None))
                .await
                .unwrap();
            assert_eq!(AnimalRepository::set_herd(&db.pool, id, Some(herd_id)).await.unwrap(), 1);
            ids.push(id);
        }

        let counts = AnimalRepository::count_by_kind(&db.pool, herd_id).await.unwrap();
        assert_eq!(counts, vec![("cow".to_string(), 2), ("sheep".to_string(), 1)]);
        assert_eq!(AnimalRepository::total_weight(&db.pool, herd_id).await.unwrap(), 300.0);

        let mut missing = ids.clone();
        missing.push(Uuid::new_v4());
        let mut existing = AnimalRepository::existing_ids(&db.pool, &missing).await.unwrap();
        existing.sort();
        ids.sort();
        assert_eq!(existing, ids);

        assert_eq!(AnimalRepository::clear_herd(&db.pool, herd_id).await.unwrap(), 3);
        assert_eq!(AnimalRepository::total_weight(&db.pool, herd_id).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_unknown_herd_reference_is_rejected() {
        let db = DBService::in_memory().await.unwrap();
        let mut data = new_animal("Stray", "cow", None);
        data.herd_id = Some(Uuid::new_v4());
        let err = AnimalRepository::create(&db.pool, Uuid::new_v4(), &data)
            .await
            .unwrap_err();
        assert!(err.as_database_error().unwrap().is_foreign_key_violation());
    }
}
