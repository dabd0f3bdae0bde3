use contracts::{
    Herd, HerdFilter, HerdPatch, NewHerd,
    api::{HerdSummary, Page, PageRequest, TransferResult, TypeCount},
};
use db::{
    begin_write,
    models::{animal::AnimalRepository, herd::HerdRepository},
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{error::ServiceError, retry::read_with_retry};

const ENTITY: &str = "herd";

pub struct HerdService {
    pool: SqlitePool,
}

impl HerdService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, data: NewHerd) -> Result<Herd, ServiceError> {
        let key = data.name.clone();
        self.try_create(data)
            .await
            .inspect_err(|e| e.log("create", ENTITY, &key))
    }

    pub async fn get(&self, id: Uuid) -> Result<Herd, ServiceError> {
        read_with_retry("get_herd", || HerdRepository::find_by_id(&self.pool, id))
            .await
            .map_err(ServiceError::from)
            .and_then(|herd| herd.ok_or(ServiceError::not_found(ENTITY, id)))
            .inspect_err(|e| e.log("get", ENTITY, &id))
    }

    pub async fn list(&self, filter: &HerdFilter, page: PageRequest) -> Result<Page<Herd>, ServiceError> {
        let result = async {
            let total = read_with_retry("count_herds", || HerdRepository::count(&self.pool, filter)).await?;
            let items =
                read_with_retry("list_herds", || HerdRepository::find_many(&self.pool, filter, page)).await?;
            Ok::<_, ServiceError>(Page {
                items,
                page: page.page,
                per_page: page.per_page,
                total,
            })
        }
        .await;
        result.inspect_err(|e| e.log("list", ENTITY, &"all"))
    }

    pub async fn replace(&self, id: Uuid, data: NewHerd) -> Result<Herd, ServiceError> {
        self.try_update(id, |_| data)
            .await
            .inspect_err(|e| e.log("replace", ENTITY, &id))
    }

    pub async fn patch(&self, id: Uuid, patch: HerdPatch) -> Result<Herd, ServiceError> {
        self.try_update(id, |current| patch.apply(current))
            .await
            .inspect_err(|e| e.log("patch", ENTITY, &id))
    }

    /// Deletes the herd; its animals stay on record without a herd.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.try_delete(id)
            .await
            .inspect_err(|e| e.log("delete", ENTITY, &id))
    }

    /// Moves every listed animal into the herd, or none of them.
    pub async fn transfer_animals(&self, herd_id: Uuid, animal_ids: Vec<Uuid>) -> Result<TransferResult, ServiceError> {
        self.try_transfer(herd_id, animal_ids)
            .await
            .inspect_err(|e| e.log("transfer_animals", ENTITY, &herd_id))
    }

    pub async fn summary(&self, id: Uuid) -> Result<HerdSummary, ServiceError> {
        let result = async {
            let herd = read_with_retry("get_herd", || HerdRepository::find_by_id(&self.pool, id))
                .await?
                .ok_or(ServiceError::not_found(ENTITY, id))?;
            let by_type = read_with_retry("count_by_kind", || AnimalRepository::count_by_kind(&self.pool, id))
                .await?
                .into_iter()
                .map(|(kind, count)| TypeCount { kind, count })
                .collect::<Vec<_>>();
            let total_weight_kg =
                read_with_retry("total_weight", || AnimalRepository::total_weight(&self.pool, id)).await?;
            Ok::<_, ServiceError>(HerdSummary {
                herd_id: herd.id,
                name: herd.name,
                head_count: by_type.iter().map(|t| t.count).sum(),
                capacity: herd.capacity,
                total_weight_kg,
                by_type,
            })
        }
        .await;
        result.inspect_err(|e| e.log("summary", ENTITY, &id))
    }

    async fn try_create(&self, data: NewHerd) -> Result<Herd, ServiceError> {
        let mut tx = begin_write(&self.pool).await?;
        ensure_name_free(&mut tx, None, &data.name).await?;

        let id = Uuid::new_v4();
        let herd = HerdRepository::create(&mut *tx, id, &data)
            .await
            .map_err(|e| constraint_error(e, &data))?;
        tx.commit().await?;

        info!(herd_id = %id, name = %herd.name, "Herd created");
        Ok(herd)
    }

    async fn try_update<F>(&self, id: Uuid, next: F) -> Result<Herd, ServiceError>
    where
        F: FnOnce(NewHerd) -> NewHerd,
    {
        let mut tx = begin_write(&self.pool).await?;
        let existing = HerdRepository::find_by_id(&mut *tx, id)
            .await?
            .ok_or(ServiceError::not_found(ENTITY, id))?;

        let current = NewHerd::from(&existing);
        let data = next(current.clone());
        if data == current {
            return Ok(existing);
        }
        ensure_name_free(&mut tx, Some(id), &data.name).await?;
        if let Some(capacity) = data.capacity {
            let head_count = HerdRepository::head_count(&mut *tx, id).await?;
            if head_count > capacity {
                return Err(ServiceError::HerdFull { herd_id: id, capacity });
            }
        }

        let updated = HerdRepository::update(&mut *tx, id, &data)
            .await
            .map_err(|e| constraint_error(e, &data))?
            .ok_or(ServiceError::not_found(ENTITY, id))?;
        tx.commit().await?;

        info!(herd_id = %id, "Herd updated");
        Ok(updated)
    }

    async fn try_delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut tx = begin_write(&self.pool).await?;
        let released = AnimalRepository::clear_herd(&mut *tx, id).await?;
        if HerdRepository::delete(&mut *tx, id).await? == 0 {
            return Err(ServiceError::not_found(ENTITY, id));
        }
        tx.commit().await?;

        info!(herd_id = %id, released, "Herd deleted");
        Ok(())
    }

    async fn try_transfer(&self, herd_id: Uuid, animal_ids: Vec<Uuid>) -> Result<TransferResult, ServiceError> {
        let mut tx = begin_write(&self.pool).await?;
        let herd = HerdRepository::find_by_id(&mut *tx, herd_id)
            .await?
            .ok_or(ServiceError::not_found(ENTITY, herd_id))?;

        let existing = AnimalRepository::existing_ids(&mut *tx, &animal_ids).await?;
        let missing: Vec<Uuid> = animal_ids
            .iter()
            .filter(|id| !existing.contains(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::AnimalsMissing(missing));
        }

        let mut moved = 0;
        for id in &animal_ids {
            moved += AnimalRepository::set_herd(&mut *tx, *id, Some(herd_id)).await?;
        }
        // Checked after the moves so animals already in the herd are not counted twice.
        if let Some(capacity) = herd.capacity {
            if HerdRepository::head_count(&mut *tx, herd_id).await? > capacity {
                return Err(ServiceError::HerdFull { herd_id, capacity });
            }
        }
        tx.commit().await?;

        info!(herd_id = %herd_id, moved, "Animals transferred");
        Ok(TransferResult { herd_id, moved })
    }
}

async fn ensure_name_free(conn: &mut SqliteConnection, own_id: Option<Uuid>, name: &str) -> Result<(), ServiceError> {
    match HerdRepository::find_by_name(&mut *conn, name).await? {
        Some(other) if Some(other.id) != own_id => Err(ServiceError::DuplicateHerdName(name.to_string())),
        _ => Ok(()),
    }
}

fn constraint_error(error: sqlx::Error, data: &NewHerd) -> ServiceError {
    match error.as_database_error() {
        Some(db_error) if db_error.is_unique_violation() => ServiceError::DuplicateHerdName(data.name.clone()),
        _ => ServiceError::Database(error),
    }
}
