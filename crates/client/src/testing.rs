//! In-memory API double with scripted latency.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use contracts::{
    Animal, AnimalFilter, CreateAnimal, CreateHerd, Herd, HerdFilter, UpdateAnimal,
    api::{HerdSummary, Page, TransferAnimals, TransferResult},
};
use uuid::Uuid;

use crate::{
    api::{AnimalApi, ApiClientError, HerdApi},
    feature::LivestockFeature,
    service,
    store::AppStore,
};

pub(crate) fn animal(name: &str, kind: &str) -> Animal {
    Animal {
        id: Uuid::new_v4(),
        name: name.to_string(),
        kind: kind.to_string(),
        tag: None,
        breed: None,
        birth_date: None,
        weight_kg: None,
        herd_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A private app store so tests do not share the global banner.
pub(crate) fn app_store() -> &'static AppStore {
    Box::leak(Box::new(AppStore::new()))
}

#[derive(Default)]
pub(crate) struct FakeApi {
    animals: Mutex<Vec<Animal>>,
    herds: Mutex<Vec<Herd>>,
    list_delays: Mutex<VecDeque<Duration>>,
    failure: Mutex<Option<ApiClientError>>,
    pub(crate) list_calls: AtomicUsize,
    pub(crate) herd_list_calls: AtomicUsize,
    pub(crate) writes: AtomicUsize,
}

impl FakeApi {
    pub(crate) fn with_animals(animals: Vec<Animal>) -> Arc<Self> {
        let fake = FakeApi::default();
        *fake.animals.lock().unwrap() = animals;
        Arc::new(fake)
    }

    pub(crate) fn feature(self: &Arc<Self>) -> LivestockFeature {
        LivestockFeature::new(self.clone(), self.clone())
    }

    pub(crate) fn set_animals(&self, animals: Vec<Animal>) {
        *self.animals.lock().unwrap() = animals;
    }

    pub(crate) fn add_herd(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.herds.lock().unwrap().push(Herd {
            id,
            name: name.to_string(),
            location: None,
            capacity: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    /// Latency of the next list calls, in call order.
    pub(crate) fn delay_lists(&self, delays: &[u64]) {
        self.list_delays
            .lock()
            .unwrap()
            .extend(delays.iter().map(|ms| Duration::from_millis(*ms)));
    }

    /// The next call of any kind fails with `error`.
    pub(crate) fn fail_next(&self, error: ApiClientError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    fn check_failure(&self) -> Result<(), ApiClientError> {
        match self.failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn store(&self, id: Uuid, body: &CreateAnimal) -> Result<Animal, ApiClientError> {
        let data = body.clone().validate().map_err(|e| ApiClientError::Validation {
            message: "request failed validation".to_string(),
            fields: e.errors,
        })?;
        let mut animal = animal(&data.name, &data.kind);
        animal.id = id;
        animal.tag = data.tag;
        animal.breed = data.breed;
        animal.birth_date = data.birth_date;
        animal.weight_kg = data.weight_kg;
        animal.herd_id = data.herd_id;
        let mut animals = self.animals.lock().unwrap();
        match animals.iter_mut().find(|a| a.id == id) {
            Some(existing) => *existing = animal.clone(),
            None => animals.push(animal.clone()),
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(animal)
    }

    fn find(&self, id: Uuid) -> Result<Animal, ApiClientError> {
        self.animals
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ApiClientError::NotFound(format!("animal {id} not found")))
    }
}

#[async_trait]
impl AnimalApi for FakeApi {
    async fn list_animals(&self, filter: &AnimalFilter) -> Result<Page<Animal>, ApiClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        // Snapshot at request time so a slow response carries stale data.
        let items: Vec<Animal> = self
            .animals
            .lock()
            .unwrap()
            .iter()
            .filter(|a| filter.kind.as_ref().is_none_or(|kind| &a.kind == kind))
            .cloned()
            .collect();
        let delay = self.list_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Page {
            total: items.len() as i64,
            items,
            page: filter.page.unwrap_or(1),
            per_page: filter.per_page.unwrap_or(25),
        })
    }

    async fn get_animal(&self, id: Uuid) -> Result<Animal, ApiClientError> {
        self.check_failure()?;
        self.find(id)
    }

    async fn create_animal(&self, body: &CreateAnimal) -> Result<Animal, ApiClientError> {
        self.check_failure()?;
        self.store(Uuid::new_v4(), body)
    }

    async fn replace_animal(&self, id: Uuid, body: &CreateAnimal) -> Result<Animal, ApiClientError> {
        self.check_failure()?;
        self.find(id)?;
        self.store(id, body)
    }

    async fn patch_animal(&self, id: Uuid, body: &UpdateAnimal) -> Result<Animal, ApiClientError> {
        self.check_failure()?;
        let current = self.find(id)?;
        let patch = body.clone().validate().map_err(|e| ApiClientError::Validation {
            message: "request failed validation".to_string(),
            fields: e.errors,
        })?;
        let merged = patch.apply(contracts::NewAnimal::from(&current));
        self.store(id, &merged.into())
    }

    async fn delete_animal(&self, id: Uuid) -> Result<(), ApiClientError> {
        self.check_failure()?;
        self.find(id)?;
        self.animals.lock().unwrap().retain(|a| a.id != id);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl HerdApi for FakeApi {
    async fn list_herds(&self, filter: &HerdFilter) -> Result<Page<Herd>, ApiClientError> {
        self.herd_list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(25);
        let herds = self.herds.lock().unwrap();
        let items = herds
            .iter()
            .skip(((page - 1) * per_page) as usize)
            .take(per_page as usize)
            .cloned()
            .collect();
        Ok(Page {
            total: herds.len() as i64,
            items,
            page,
            per_page,
        })
    }

    async fn create_herd(&self, body: &CreateHerd) -> Result<Herd, ApiClientError> {
        self.check_failure()?;
        let data = body.clone().validate().map_err(|e| ApiClientError::Validation {
            message: "request failed validation".to_string(),
            fields: e.errors,
        })?;
        let mut herds = self.herds.lock().unwrap();
        if herds.iter().any(|h| h.name == data.name) {
            return Err(ApiClientError::Conflict(format!("a herd named '{}' already exists", data.name)));
        }
        let herd = Herd {
            id: Uuid::new_v4(),
            name: data.name,
            location: data.location,
            capacity: data.capacity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        herds.push(herd.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(herd)
    }

    async fn herd_summary(&self, id: Uuid) -> Result<HerdSummary, ApiClientError> {
        self.check_failure()?;
        let herd = self
            .herds
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.id == id)
            .cloned()
            .ok_or_else(|| ApiClientError::NotFound(format!("herd {id} not found")))?;
        let members: Vec<Animal> = self
            .animals
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.herd_id == Some(id))
            .cloned()
            .collect();
        let tally = service::herd_summary(&members);
        Ok(HerdSummary {
            herd_id: herd.id,
            name: herd.name,
            head_count: tally.head_count,
            capacity: herd.capacity,
            total_weight_kg: tally.total_weight_kg,
            by_type: tally.by_type,
        })
    }

    async fn transfer_animals(&self, herd_id: Uuid, body: &TransferAnimals) -> Result<TransferResult, ApiClientError> {
        self.check_failure()?;
        let capacity = self
            .herds
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.id == herd_id)
            .map(|h| h.capacity)
            .ok_or_else(|| ApiClientError::NotFound(format!("herd {herd_id} not found")))?;
        let mut animals = self.animals.lock().unwrap();
        if let Some(missing) = body.animal_ids.iter().find(|id| !animals.iter().any(|a| a.id == **id)) {
            return Err(ApiClientError::NotFound(format!("animal {missing} not found")));
        }
        let incoming = animals
            .iter()
            .filter(|a| body.animal_ids.contains(&a.id) && a.herd_id != Some(herd_id))
            .count() as i64;
        let present = animals.iter().filter(|a| a.herd_id == Some(herd_id)).count() as i64;
        if let Some(cap) = capacity.filter(|cap| present + incoming > *cap) {
            return Err(ApiClientError::Conflict(format!("herd {herd_id} is at capacity ({cap})")));
        }
        let mut moved = 0;
        for animal in animals.iter_mut().filter(|a| body.animal_ids.contains(&a.id)) {
            animal.herd_id = Some(herd_id);
            moved += 1;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(TransferResult { herd_id, moved })
    }
}
