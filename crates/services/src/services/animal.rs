//! Business rules for individual animals.

use contracts::{
    Animal, AnimalFilter, AnimalPatch, NewAnimal,
    api::{Page, PageRequest},
};
use db::{
    begin_write,
    models::{animal::AnimalRepository, herd::HerdRepository},
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{error::ServiceError, retry::read_with_retry};

const ENTITY: &str = "animal";

pub struct AnimalService {
    pool: SqlitePool,
}

impl AnimalService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, data: NewAnimal) -> Result<Animal, ServiceError> {
        let key = data.name.clone();
        self.try_create(data)
            .await
            .inspect_err(|e| e.log("create", ENTITY, &key))
    }

    pub async fn get(&self, id: Uuid) -> Result<Animal, ServiceError> {
        read_with_retry("get_animal", || AnimalRepository::find_by_id(&self.pool, id))
            .await
            .map_err(ServiceError::from)
            .and_then(|animal| animal.ok_or(ServiceError::not_found(ENTITY, id)))
            .inspect_err(|e| e.log("get", ENTITY, &id))
    }

    pub async fn list(&self, filter: &AnimalFilter, page: PageRequest) -> Result<Page<Animal>, ServiceError> {
        let result = async {
            let total = read_with_retry("count_animals", || AnimalRepository::count(&self.pool, filter)).await?;
            let items =
                read_with_retry("list_animals", || AnimalRepository::find_many(&self.pool, filter, page))
                    .await?;
            Ok::<_, ServiceError>(Page {
                items,
                page: page.page,
                per_page: page.per_page,
                total,
            })
        }
        .await;
        result.inspect_err(|e| e.log("list", ENTITY, &format_args!("{filter:?}")))
    }

    /// Full replacement (PUT).
    pub async fn replace(&self, id: Uuid, data: NewAnimal) -> Result<Animal, ServiceError> {
        self.try_update(id, |_| data)
            .await
            .inspect_err(|e| e.log("replace", ENTITY, &id))
    }

    /// Partial update (PATCH); absent fields keep their stored values.
    pub async fn patch(&self, id: Uuid, patch: AnimalPatch) -> Result<Animal, ServiceError> {
        self.try_update(id, |current| patch.apply(current))
            .await
            .inspect_err(|e| e.log("patch", ENTITY, &id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = match AnimalRepository::delete(&self.pool, id).await {
            Ok(0) => Err(ServiceError::not_found(ENTITY, id)),
            Ok(_) => {
                info!(animal_id = %id, "Animal deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        };
        result.inspect_err(|e| e.log("delete", ENTITY, &id))
    }

    async fn try_create(&self, data: NewAnimal) -> Result<Animal, ServiceError> {
        let mut tx = begin_write(&self.pool).await?;
        check_rules(&mut tx, None, &data).await?;

        let id = Uuid::new_v4();
        let animal = AnimalRepository::create(&mut *tx, id, &data)
            .await
            .map_err(|e| constraint_error(e, &data))?;
        tx.commit().await?;

        info!(animal_id = %id, kind = %animal.kind, "Animal created");
        Ok(animal)
    }

    /// Loads the row, derives the new values and writes them in one transaction.
    ///
    /// Writing values equal to the stored ones is skipped so repeated
    /// identical updates leave the row, `updated_at` included, untouched.
    async fn try_update<F>(&self, id: Uuid, next: F) -> Result<Animal, ServiceError>
    where
        F: FnOnce(NewAnimal) -> NewAnimal,
    {
        let mut tx = begin_write(&self.pool).await?;
        let existing = AnimalRepository::find_by_id(&mut *tx, id)
            .await?
            .ok_or(ServiceError::not_found(ENTITY, id))?;

        let current = NewAnimal::from(&existing);
        let data = next(current.clone());
        if data == current {
            return Ok(existing);
        }
        check_rules(&mut tx, Some(&existing), &data).await?;

        let updated = AnimalRepository::update(&mut *tx, id, &data)
            .await
            .map_err(|e| constraint_error(e, &data))?
            .ok_or(ServiceError::not_found(ENTITY, id))?;
        tx.commit().await?;

        info!(animal_id = %id, "Animal updated");
        Ok(updated)
    }
}

/// Tag uniqueness, herd existence and herd capacity.
async fn check_rules(
    conn: &mut SqliteConnection,
    existing: Option<&Animal>,
    data: &NewAnimal,
) -> Result<(), ServiceError> {
    if let Some(tag) = &data.tag {
        if let Some(other) = AnimalRepository::find_by_tag(&mut *conn, tag).await? {
            if existing.is_none_or(|animal| animal.id != other.id) {
                return Err(ServiceError::DuplicateTag(tag.clone()));
            }
        }
    }

    let Some(herd_id) = data.herd_id else {
        return Ok(());
    };
    if existing.is_some_and(|animal| animal.herd_id == Some(herd_id)) {
        return Ok(());
    }
    let herd = HerdRepository::find_by_id(&mut *conn, herd_id)
        .await?
        .ok_or(ServiceError::HerdMissing(herd_id))?;
    if let Some(capacity) = herd.capacity {
        let head_count = HerdRepository::head_count(&mut *conn, herd_id).await?;
        if head_count >= capacity {
            return Err(ServiceError::HerdFull { herd_id, capacity });
        }
    }
    Ok(())
}

/// Constraint violations that slipped past `check_rules` in a race.
fn constraint_error(error: sqlx::Error, data: &NewAnimal) -> ServiceError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.is_unique_violation() {
            if let Some(tag) = &data.tag {
                return ServiceError::DuplicateTag(tag.clone());
            }
        }
        if db_error.is_foreign_key_violation() {
            if let Some(herd_id) = data.herd_id {
                return ServiceError::HerdMissing(herd_id);
            }
        }
    }
    ServiceError::Database(error)
}
