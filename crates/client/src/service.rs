//! Frontend service: pure presentation helpers plus the data-access handles
//! they are composed with. Holds no request state.

use std::{collections::BTreeMap, sync::Arc};

use contracts::{
    Animal, AnimalFilter, CreateAnimal, CreateHerd, Herd, HerdFilter, UpdateAnimal,
    api::{HerdSummary, MAX_PER_PAGE, Page, TransferAnimals, TransferResult, TypeCount},
};
use uuid::Uuid;

use crate::api::{AnimalApi, ApiClientError, HerdApi};

/// One-line label, e.g. `Bessy (cow, #UK-1)`.
pub fn display_label(animal: &Animal) -> String {
    match &animal.tag {
        Some(tag) => format!("{} ({}, #{tag})", animal.name, animal.kind),
        None => format!("{} ({})", animal.name, animal.kind),
    }
}

/// Head count per type and total weight of a set of animals.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub head_count: i64,
    pub by_type: Vec<TypeCount>,
    pub total_weight_kg: f64,
}

pub fn herd_summary(animals: &[Animal]) -> Tally {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for animal in animals {
        *counts.entry(animal.kind.as_str()).or_default() += 1;
    }
    Tally {
        head_count: animals.len() as i64,
        by_type: counts
            .into_iter()
            .map(|(kind, count)| TypeCount { kind: kind.to_string(), count })
            .collect(),
        total_weight_kg: animals.iter().filter_map(|a| a.weight_kg).sum(),
    }
}

/// Replaces the animal with the same id, or appends it.
pub fn upsert(animals: &[Animal], animal: Animal) -> Vec<Animal> {
    let mut out = animals.to_vec();
    match out.iter_mut().find(|a| a.id == animal.id) {
        Some(existing) => *existing = animal,
        None => out.push(animal),
    }
    out
}

pub fn without(animals: &[Animal], id: Uuid) -> Vec<Animal> {
    animals.iter().filter(|a| a.id != id).cloned().collect()
}

/// Number of pages for `total` rows; an empty listing still has one page.
pub fn page_count(total: i64, per_page: u32) -> u32 {
    if total <= 0 || per_page == 0 {
        return 1;
    }
    let pages = (total + i64::from(per_page) - 1) / i64::from(per_page);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Sentence shown to the user for a failed request.
pub fn user_message(error: &ApiClientError) -> String {
    match error {
        ApiClientError::Validation { fields, .. } if !fields.is_empty() => {
            "Some fields need attention.".to_string()
        }
        ApiClientError::Validation { message, .. } => format!("The request was rejected: {message}."),
        ApiClientError::NotFound(_) => "That record no longer exists.".to_string(),
        ApiClientError::Conflict(message) => format!("Could not save: {message}."),
        ApiClientError::Server(_) => "The server ran into a problem. Please try again.".to_string(),
        ApiClientError::Transport(_) => "Could not reach the server. Check your connection.".to_string(),
        ApiClientError::Contract(_) => "The server sent data this app does not understand.".to_string(),
    }
}

/// Data access for the livestock screens.
#[derive(Clone)]
pub struct LivestockService {
    animals: Arc<dyn AnimalApi>,
    herds: Arc<dyn HerdApi>,
}

impl LivestockService {
    pub fn new(animals: Arc<dyn AnimalApi>, herds: Arc<dyn HerdApi>) -> Self {
        Self { animals, herds }
    }

    pub async fn list_animals(&self, filter: &AnimalFilter) -> Result<Page<Animal>, ApiClientError> {
        self.animals.list_animals(filter).await
    }

    pub async fn get_animal(&self, id: Uuid) -> Result<Animal, ApiClientError> {
        self.animals.get_animal(id).await
    }

    pub async fn create_animal(&self, body: &CreateAnimal) -> Result<Animal, ApiClientError> {
        self.animals.create_animal(body).await
    }

    pub async fn replace_animal(&self, id: Uuid, body: &CreateAnimal) -> Result<Animal, ApiClientError> {
        self.animals.replace_animal(id, body).await
    }

    pub async fn patch_animal(&self, id: Uuid, body: &UpdateAnimal) -> Result<Animal, ApiClientError> {
        self.animals.patch_animal(id, body).await
    }

    pub async fn delete_animal(&self, id: Uuid) -> Result<(), ApiClientError> {
        self.animals.delete_animal(id).await
    }

    /// Herd names by id, for labelling animals. Walks every page.
    pub async fn herd_names(&self) -> Result<BTreeMap<Uuid, String>, ApiClientError> {
        let mut names = BTreeMap::new();
        let mut page = 1;
        loop {
            let filter = HerdFilter {
                page: Some(page),
                per_page: Some(MAX_PER_PAGE),
            };
            let batch = self.herds.list_herds(&filter).await?;
            let fetched = batch.items.len();
            names.extend(batch.items.into_iter().map(|h| (h.id, h.name)));
            if fetched < MAX_PER_PAGE as usize || names.len() as i64 >= batch.total {
                return Ok(names);
            }
            page += 1;
        }
    }

    pub async fn create_herd(&self, body: &CreateHerd) -> Result<Herd, ApiClientError> {
        self.herds.create_herd(body).await
    }

    pub async fn herd_summary(&self, id: Uuid) -> Result<HerdSummary, ApiClientError> {
        self.herds.herd_summary(id).await
    }

    pub async fn move_to_herd(&self, herd_id: Uuid, animal_ids: Vec<Uuid>) -> Result<TransferResult, ApiClientError> {
        self.herds
            .transfer_animals(herd_id, &TransferAnimals { animal_ids })
            .await
    }
}

#[cfg(test)]
mod tests {
    use contracts::{FieldError, FieldErrorCode};

    use super::*;
    use crate::testing::{FakeApi, animal};

    #[test]
    fn test_display_label() {
        let mut bessy = animal("Bessy", "cow");
        assert_eq!(display_label(&bessy), "Bessy (cow)");
        bessy.tag = Some("UK-1".to_string());
        assert_eq!(display_label(&bessy), "Bessy (cow, #UK-1)");
    }

    #[test]
    fn test_herd_summary_counts_types_and_weight() {
        let mut a = animal("A", "cow");
        a.weight_kg = Some(400.0);
        let mut b = animal("B", "sheep");
        b.weight_kg = Some(55.5);
        let c = animal("C", "cow");

        let tally = herd_summary(&[a, b, c]);
        assert_eq!(tally.head_count, 3);
        assert_eq!(tally.total_weight_kg, 455.5);
        assert_eq!(tally.by_type[0], TypeCount { kind: "cow".to_string(), count: 2 });
        assert_eq!(tally.by_type[1].kind, "sheep");
    }

    #[test]
    fn test_upsert_and_without() {
        let a = animal("A", "pig");
        let b = animal("B", "pig");
        let list = upsert(&[a.clone()], b.clone());
        assert_eq!(list.len(), 2);

        let mut renamed = a.clone();
        renamed.name = "Ada".to_string();
        let list = upsert(&list, renamed);
        assert_eq!(list[0].name, "Ada");
        assert_eq!(list.len(), 2);

        assert_eq!(without(&list, a.id), vec![b]);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 25), 1);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
        assert_eq!(page_count(10, 0), 1);
    }

    #[test]
    fn test_user_message_never_leaks_detail() {
        let msg = user_message(&ApiClientError::Server("SQLITE_BUSY at line 3".to_string()));
        assert!(!msg.contains("SQLITE"));

        let msg = user_message(&ApiClientError::Validation {
            message: "request failed validation".to_string(),
            fields: vec![FieldError {
                field: "name".to_string(),
                code: FieldErrorCode::Required,
                message: "is required".to_string(),
            }],
        });
        assert_eq!(msg, "Some fields need attention.");
    }

    #[tokio::test]
    async fn test_herd_names_walks_every_page() {
        let fake = FakeApi::with_animals(Vec::new());
        for i in 0..150 {
            fake.add_herd(&format!("Herd {i:03}"));
        }
        let service = LivestockService::new(fake.clone(), fake.clone());

        let names = service.herd_names().await.unwrap();
        assert_eq!(names.len(), 150);
        assert!(names.values().any(|n| n == "Herd 149"));
        assert_eq!(fake.herd_list_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
