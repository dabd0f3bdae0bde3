//! Mediator between one UI surface and the animal store.
//!
//! Every operation returns `()`. Results and failures land in the store, and
//! components observe them through its read-only projections. List loads,
//! selections and herd summaries follow last-request-wins: each takes a
//! ticket and a response whose ticket has been superseded is dropped.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use contracts::{
    Animal, AnimalFilter, CreateAnimal, CreateHerd, UpdateAnimal, ValidationErrors,
    api::{HerdSummary, TransferAnimals},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    api::ApiClientError,
    service::{self, LivestockService},
    store::{AnimalStore, AppStore, Operation},
};

/// Generation counter for one kind of request.
#[derive(Debug, Default)]
struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

pub struct AnimalFacade {
    store: Arc<AnimalStore>,
    service: LivestockService,
    app: &'static AppStore,
    list_requests: RequestTracker,
    select_requests: RequestTracker,
    summary_requests: RequestTracker,
}

impl AnimalFacade {
    pub(crate) fn new(store: Arc<AnimalStore>, service: LivestockService, app: &'static AppStore) -> Self {
        Self {
            store,
            service,
            app,
            list_requests: RequestTracker::default(),
            select_requests: RequestTracker::default(),
            summary_requests: RequestTracker::default(),
        }
    }

    /// Read-only view of the state this facade writes.
    pub fn state(&self) -> &AnimalStore {
        &self.store
    }

    pub fn app(&self) -> &'static AppStore {
        self.app
    }

    /// Fetches the current page under the current type filter.
    pub async fn load_list(&self) {
        let ticket = self.list_requests.begin();
        let _busy = self.store.begin(Operation::List);
        self.store.set_error(None);

        let filter = AnimalFilter {
            kind: self.store.filter().get(),
            herd_id: None,
            page: Some(self.store.page().get()),
            per_page: Some(self.store.per_page().get()),
        };
        let result = self.service.list_animals(&filter).await;
        if !self.list_requests.is_current(ticket) {
            debug!(ticket, "Discarding superseded list response");
            return;
        }

        match result {
            Ok(page) => {
                let needs_names = {
                    let names = self.store.herd_names().get();
                    page.items
                        .iter()
                        .filter_map(|a| a.herd_id)
                        .any(|id| !names.contains_key(&id))
                };
                self.store.set_total(page.total);
                self.store.set_per_page(page.per_page);
                self.store.set_animals(page.items);
                if needs_names {
                    self.refresh_herd_names(ticket).await;
                }
            }
            Err(e) => self.fail("load_list", &e),
        }
    }

    async fn refresh_herd_names(&self, ticket: u64) {
        match self.service.herd_names().await {
            Ok(names) if self.list_requests.is_current(ticket) => self.store.set_herd_names(names),
            Ok(_) => {}
            // Labels fall back to ids; not worth failing the list over.
            Err(e) => warn!(error = %e, "Failed to load herd names"),
        }
    }

    pub async fn request_page(&self, page: u32) {
        if page == 0 {
            return;
        }
        self.store.set_page(page);
        self.load_list().await;
    }

    pub async fn next_page(&self) {
        let page = self.store.page().get();
        let last = service::page_count(self.store.total().get(), self.store.per_page().get());
        if page < last {
            self.request_page(page + 1).await;
        }
    }

    pub async fn previous_page(&self) {
        let page = self.store.page().get();
        if page > 1 {
            self.request_page(page - 1).await;
        }
    }

    /// Narrows the list to one animal type, or clears the filter with `None`.
    pub async fn filter_by_type(&self, kind: Option<String>) {
        let candidate = AnimalFilter {
            kind: kind.clone(),
            ..Default::default()
        };
        if let Err(errors) = candidate.validate() {
            self.store.set_form_errors(errors.errors);
            return;
        }
        self.store.set_form_errors(Vec::new());
        self.store.set_filter(kind);
        self.store.set_page(1);
        self.load_list().await;
    }

    pub async fn select(&self, id: Uuid) {
        let ticket = self.select_requests.begin();
        let _busy = self.store.begin(Operation::Detail);
        let result = self.service.get_animal(id).await;
        if !self.select_requests.is_current(ticket) {
            debug!(ticket, "Discarding superseded selection");
            return;
        }
        match result {
            Ok(animal) => {
                self.store.set_animals(service::upsert(&self.store.animals().get(), animal.clone()));
                self.store.set_selected(Some(animal));
            }
            Err(e) => {
                self.store.set_selected(None);
                self.fail("select", &e);
            }
        }
    }

    pub async fn submit_create(&self, form: CreateAnimal) {
        if self.accept_form(form.clone().validate()).is_none() {
            return;
        }
        let _busy = self.store.begin(Operation::Save);
        match self.service.create_animal(&form).await {
            Ok(animal) => {
                self.store.set_total(self.store.total().get() + 1);
                self.saved(animal, "Added");
            }
            Err(e) => self.fail("submit_create", &e),
        }
    }

    /// Full replacement of an existing animal.
    pub async fn submit_update(&self, id: Uuid, form: CreateAnimal) {
        if self.accept_form(form.clone().validate()).is_none() {
            return;
        }
        let _busy = self.store.begin(Operation::Save);
        match self.service.replace_animal(id, &form).await {
            Ok(animal) => self.saved(animal, "Updated"),
            Err(e) => self.fail("submit_update", &e),
        }
    }

    pub async fn submit_patch(&self, id: Uuid, form: UpdateAnimal) {
        if self.accept_form(form.clone().validate()).is_none() {
            return;
        }
        let _busy = self.store.begin(Operation::Save);
        match self.service.patch_animal(id, &form).await {
            Ok(animal) => self.saved(animal, "Updated"),
            Err(e) => self.fail("submit_patch", &e),
        }
    }

    pub async fn delete(&self, id: Uuid) {
        let _busy = self.store.begin(Operation::Save);
        match self.service.delete_animal(id).await {
            Ok(()) => {
                let animals = self.store.animals().get();
                let name = animals.iter().find(|a| a.id == id).map(|a| a.name.clone());
                if animals.iter().any(|a| a.id == id) {
                    self.store.set_total((self.store.total().get() - 1).max(0));
                }
                self.store.set_animals(service::without(&animals, id));
                if self.store.selected().with(|s| s.as_ref().is_some_and(|a| a.id == id)) {
                    self.store.set_selected(None);
                }
                self.app
                    .set_notice(Some(format!("Removed {}", name.unwrap_or_else(|| id.to_string()))));
            }
            Err(e) => self.fail("delete", &e),
        }
    }

    /// Registers a herd. It opens as the current herd summary with no animals.
    pub async fn create_herd(&self, form: CreateHerd) {
        if self.accept_form(form.clone().validate()).is_none() {
            return;
        }
        let _busy = self.store.begin(Operation::Save);
        match self.service.create_herd(&form).await {
            Ok(herd) => {
                let mut names = self.store.herd_names().get();
                names.insert(herd.id, herd.name.clone());
                self.store.set_herd_names(names);
                self.app.set_notice(Some(format!("Added herd {}", herd.name)));
                self.store.set_herd_summary(Some(HerdSummary {
                    herd_id: herd.id,
                    name: herd.name,
                    head_count: 0,
                    capacity: herd.capacity,
                    total_weight_kg: 0.0,
                    by_type: Vec::new(),
                }));
            }
            Err(e) => self.fail("create_herd", &e),
        }
    }

    pub async fn show_herd(&self, id: Uuid) {
        let ticket = self.summary_requests.begin();
        let _busy = self.store.begin(Operation::Detail);
        let result = self.service.herd_summary(id).await;
        if !self.summary_requests.is_current(ticket) {
            debug!(ticket, "Discarding superseded herd summary");
            return;
        }
        match result {
            Ok(summary) => {
                let mut names = self.store.herd_names().get();
                names.insert(summary.herd_id, summary.name.clone());
                self.store.set_herd_names(names);
                self.store.set_herd_summary(Some(summary));
            }
            Err(e) => {
                self.store.set_herd_summary(None);
                self.fail("show_herd", &e);
            }
        }
    }

    /// Moves animals into a herd; all of them move or none do.
    pub async fn move_to_herd(&self, herd_id: Uuid, animal_ids: Vec<Uuid>) {
        let Some(ids) = self.accept_form(TransferAnimals { animal_ids }.validate()) else {
            return;
        };
        let result = {
            let _busy = self.store.begin(Operation::Save);
            self.service.move_to_herd(herd_id, ids.clone()).await
        };
        match result {
            Ok(moved) => {
                let relabel = |animal: &Animal| {
                    let mut animal = animal.clone();
                    if ids.contains(&animal.id) {
                        animal.herd_id = Some(herd_id);
                    }
                    animal
                };
                let animals = self.store.animals().get().iter().map(relabel).collect();
                self.store.set_animals(animals);
                if let Some(selected) = self.store.selected().get() {
                    self.store.set_selected(Some(relabel(&selected)));
                }
                let herd = self
                    .store
                    .herd_names()
                    .with(|names| names.get(&herd_id).cloned())
                    .unwrap_or_else(|| herd_id.to_string());
                self.app
                    .set_notice(Some(format!("Moved {} animals into {herd}", moved.moved)));
                self.show_herd(herd_id).await;
            }
            Err(e) => self.fail("move_to_herd", &e),
        }
    }

    pub fn dismiss_error(&self) {
        self.store.set_error(None);
        self.store.set_form_errors(Vec::new());
    }

    /// Records client-side validation errors; `Some` when the form may be sent.
    fn accept_form<T>(&self, checked: Result<T, ValidationErrors>) -> Option<T> {
        match checked {
            Ok(valid) => {
                self.store.set_form_errors(Vec::new());
                self.store.set_error(None);
                Some(valid)
            }
            Err(errors) => {
                self.store.set_form_errors(errors.errors);
                None
            }
        }
    }

    fn saved(&self, animal: Animal, verb: &str) {
        self.app.set_notice(Some(format!("{verb} {}", service::display_label(&animal))));
        self.store.set_animals(service::upsert(&self.store.animals().get(), animal.clone()));
        self.store.set_selected(Some(animal));
    }

    fn fail(&self, operation: &'static str, error: &ApiClientError) {
        debug!(operation, error = %error, "Request failed");
        if let ApiClientError::Validation { fields, .. } = error {
            if !fields.is_empty() {
                self.store.set_form_errors(fields.clone());
            }
        }
        self.store.set_error(Some(service::user_message(error)));
    }
}
