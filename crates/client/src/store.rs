//! State containers. Setters are crate-private: only facades write.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use contracts::{
    Animal, FieldError,
    api::{DEFAULT_PER_PAGE, HerdSummary},
};
use once_cell::sync::Lazy;
use strum_macros::Display;
use uuid::Uuid;

use crate::signal::{ReadSignal, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
}

/// Kinds of request tracked by their own phase node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Listing and paging animals.
    List,
    /// Fetching one animal or one herd summary.
    Detail,
    /// Creates, updates, deletes and transfers.
    Save,
}

/// Phase of one kind of operation, shared by every facade on the store.
///
/// Stays `Loading` while any request of that kind is in flight.
#[derive(Debug)]
struct Activity {
    phase: Signal<Phase>,
    in_flight: AtomicUsize,
}

impl Activity {
    fn new() -> Self {
        Self {
            phase: Signal::new(Phase::Idle),
            in_flight: AtomicUsize::new(0),
        }
    }

    fn start(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.phase.set(Phase::Loading);
    }

    fn finish(&self) {
        let previous = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or_default();
        if previous <= 1 {
            self.phase.set(Phase::Idle);
        }
    }
}

/// Marks one request in flight until dropped.
pub(crate) struct InFlight<'a> {
    activity: &'a Activity,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.activity.finish();
    }
}

/// Feature-scoped state of the animal screens.
#[derive(Debug)]
pub struct AnimalStore {
    animals: Signal<Vec<Animal>>,
    total: Signal<i64>,
    page: Signal<u32>,
    per_page: Signal<u32>,
    filter: Signal<Option<String>>,
    list_phase: Activity,
    detail_phase: Activity,
    save_phase: Activity,
    error: Signal<Option<String>>,
    form_errors: Signal<Vec<FieldError>>,
    selected: Signal<Option<Animal>>,
    herd_names: Signal<BTreeMap<Uuid, String>>,
    herd_summary: Signal<Option<HerdSummary>>,
}

impl AnimalStore {
    pub(crate) fn new() -> Self {
        Self {
            animals: Signal::new(Vec::new()),
            total: Signal::new(0),
            page: Signal::new(1),
            per_page: Signal::new(DEFAULT_PER_PAGE),
            filter: Signal::new(None),
            list_phase: Activity::new(),
            detail_phase: Activity::new(),
            save_phase: Activity::new(),
            error: Signal::new(None),
            form_errors: Signal::new(Vec::new()),
            selected: Signal::new(None),
            herd_names: Signal::new(BTreeMap::new()),
            herd_summary: Signal::new(None),
        }
    }

    pub fn animals(&self) -> ReadSignal<Vec<Animal>> {
        self.animals.read_only()
    }

    pub fn total(&self) -> ReadSignal<i64> {
        self.total.read_only()
    }

    pub fn page(&self) -> ReadSignal<u32> {
        self.page.read_only()
    }

    pub fn per_page(&self) -> ReadSignal<u32> {
        self.per_page.read_only()
    }

    /// Animal type the list is narrowed to, if any.
    pub fn filter(&self) -> ReadSignal<Option<String>> {
        self.filter.read_only()
    }

    fn activity(&self, operation: Operation) -> &Activity {
        match operation {
            Operation::List => &self.list_phase,
            Operation::Detail => &self.detail_phase,
            Operation::Save => &self.save_phase,
        }
    }

    pub fn phase(&self, operation: Operation) -> ReadSignal<Phase> {
        self.activity(operation).phase.read_only()
    }

    pub fn error(&self) -> ReadSignal<Option<String>> {
        self.error.read_only()
    }

    pub fn form_errors(&self) -> ReadSignal<Vec<FieldError>> {
        self.form_errors.read_only()
    }

    pub fn selected(&self) -> ReadSignal<Option<Animal>> {
        self.selected.read_only()
    }

    pub fn herd_names(&self) -> ReadSignal<BTreeMap<Uuid, String>> {
        self.herd_names.read_only()
    }

    /// Summary of the herd last opened.
    pub fn herd_summary(&self) -> ReadSignal<Option<HerdSummary>> {
        self.herd_summary.read_only()
    }

    pub(crate) fn set_animals(&self, value: Vec<Animal>) {
        self.animals.set(value);
    }

    pub(crate) fn set_total(&self, value: i64) {
        self.total.set(value);
    }

    pub(crate) fn set_page(&self, value: u32) {
        self.page.set(value);
    }

    pub(crate) fn set_per_page(&self, value: u32) {
        self.per_page.set(value);
    }

    pub(crate) fn set_filter(&self, value: Option<String>) {
        self.filter.set(value);
    }

    /// Puts `operation` in the loading phase until the guard is dropped.
    pub(crate) fn begin(&self, operation: Operation) -> InFlight<'_> {
        let activity = self.activity(operation);
        activity.start();
        InFlight { activity }
    }

    pub(crate) fn set_error(&self, value: Option<String>) {
        self.error.set(value);
    }

    pub(crate) fn set_form_errors(&self, value: Vec<FieldError>) {
        self.form_errors.set(value);
    }

    pub(crate) fn set_selected(&self, value: Option<Animal>) {
        self.selected.set(value);
    }

    pub(crate) fn set_herd_names(&self, value: BTreeMap<Uuid, String>) {
        self.herd_names.set(value);
    }

    pub(crate) fn set_herd_summary(&self, value: Option<HerdSummary>) {
        self.herd_summary.set(value);
    }
}

static APP_STORE: Lazy<AppStore> = Lazy::new(AppStore::new);

/// Process-wide state shared by every feature.
#[derive(Debug)]
pub struct AppStore {
    notice: Signal<Option<String>>,
}

impl AppStore {
    pub(crate) fn new() -> Self {
        Self { notice: Signal::new(None) }
    }

    pub fn global() -> &'static AppStore {
        &APP_STORE
    }

    /// Last confirmation banner, e.g. after a save.
    pub fn notice(&self) -> ReadSignal<Option<String>> {
        self.notice.read_only()
    }

    pub(crate) fn set_notice(&self, value: Option<String>) {
        self.notice.set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_reflects_setter_synchronously() {
        let store = AnimalStore::new();
        let error = store.error();
        let total = store.total();

        store.set_error(Some("boom".to_string()));
        assert_eq!(error.get().as_deref(), Some("boom"));
        store.set_total(3);
        assert_eq!(total.get(), 3);
    }

    #[test]
    fn test_phase_is_idle_only_after_last_request_of_its_kind() {
        let store = AnimalStore::new();
        let list = store.phase(Operation::List);

        let first = store.begin(Operation::List);
        let second = store.begin(Operation::List);
        let save = store.begin(Operation::Save);
        drop(save);
        assert_eq!(store.phase(Operation::Save).get(), Phase::Idle);
        assert_eq!(list.get(), Phase::Loading);

        drop(first);
        assert_eq!(list.get(), Phase::Loading);
        drop(second);
        assert_eq!(list.get(), Phase::Idle);
        assert_eq!(store.phase(Operation::Detail).get(), Phase::Idle);
    }

    #[test]
    fn test_defaults() {
        let store = AnimalStore::new();
        assert_eq!(store.page().get(), 1);
        assert_eq!(store.per_page().get(), DEFAULT_PER_PAGE);
        assert!(store.animals().get().is_empty());
        assert_eq!(store.phase(Operation::List).get().to_string(), "idle");
    }

    #[test]
    fn test_global_store_is_shared() {
        assert!(std::ptr::eq(AppStore::global(), AppStore::global()));
    }
}
