//! Terminal views. Each owns one facade, forwards events to it and renders
//! text from the store projections.

use std::fmt::Write as _;

use chrono::NaiveDate;
use contracts::{Animal, CreateAnimal, CreateHerd, UpdateAnimal};
use uuid::Uuid;

use crate::{
    facade::AnimalFacade,
    service::{self, display_label, page_count},
    store::{Operation, Phase},
};

pub struct AnimalListView {
    facade: AnimalFacade,
}

impl AnimalListView {
    pub fn new(facade: AnimalFacade) -> Self {
        Self { facade }
    }

    pub async fn mount(&self) {
        self.facade.load_list().await;
    }

    pub async fn show_page(&self, page: u32) {
        self.facade.request_page(page).await;
    }

    pub async fn next(&self) {
        self.facade.next_page().await;
    }

    pub async fn previous(&self) {
        self.facade.previous_page().await;
    }

    pub async fn filter(&self, kind: Option<String>) {
        self.facade.filter_by_type(kind).await;
    }

    pub async fn open(&self, id: Uuid) {
        self.facade.select(id).await;
    }

    pub async fn remove(&self, id: Uuid) {
        self.facade.delete(id).await;
    }

    pub fn has_error(&self) -> bool {
        self.facade.state().error().with(Option::is_some)
            || self.facade.state().form_errors().with(|e| !e.is_empty())
    }

    pub fn render(&self) -> String {
        let state = self.facade.state();
        let animals = state.animals().get();
        let names = state.herd_names().get();
        let pages = page_count(state.total().get(), state.per_page().get());

        let mut out = String::new();
        let kind = state.filter().get().unwrap_or_else(|| "all".to_string());
        let _ = write!(out, "Animals ({kind}): {} total, page {}/{pages}", state.total().get(), state.page().get());
        if state.phase(Operation::List).get() == Phase::Loading {
            out.push_str(" [loading]");
        }
        out.push('\n');
        if let Some(notice) = self.facade.app().notice().get() {
            let _ = writeln!(out, "* {notice}");
        }
        if let Some(error) = state.error().get() {
            let _ = writeln!(out, "! {error}");
        }
        for error in state.form_errors().get() {
            let _ = writeln!(out, "! {}: {}", error.field, error.message);
        }
        if animals.is_empty() {
            out.push_str("  (no animals)\n");
        }
        for animal in &animals {
            let herd = animal
                .herd_id
                .map(|id| names.get(&id).cloned().unwrap_or_else(|| id.to_string()));
            match herd {
                Some(herd) => {
                    let _ = writeln!(out, "  {}  {}  in {herd}", animal.id, display_label(animal));
                }
                None => {
                    let _ = writeln!(out, "  {}  {}", animal.id, display_label(animal));
                }
            }
        }
        if !animals.is_empty() {
            let tally = service::herd_summary(&animals);
            let by_type = tally
                .by_type
                .iter()
                .map(|t| format!("{} {}", t.count, t.kind))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "  on this page: {by_type}; {:.1} kg", tally.total_weight_kg);
        }
        if let Some(selected) = state.selected().get() {
            out.push_str(&render_detail(&selected));
        }
        out
    }
}

fn render_detail(animal: &Animal) -> String {
    let mut out = format!("\n{}\n", display_label(animal));
    let rows = [
        ("id", Some(animal.id.to_string())),
        ("breed", animal.breed.clone()),
        ("born", animal.birth_date.map(|d| d.to_string())),
        ("weight", animal.weight_kg.map(|w| format!("{w} kg"))),
        ("herd", animal.herd_id.map(|h| h.to_string())),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            let _ = writeln!(out, "  {label:<7}{value}");
        }
    }
    out
}

/// Form for adding or editing one animal. Input is raw text; parsing errors
/// are shown beside the field and block submission.
pub struct AnimalFormView {
    facade: AnimalFacade,
    draft: CreateAnimal,
    editing: Option<Uuid>,
    touched: Vec<&'static str>,
    input_errors: Vec<(String, String)>,
}

impl AnimalFormView {
    pub fn new(facade: AnimalFacade) -> Self {
        Self {
            facade,
            draft: CreateAnimal::default(),
            editing: None,
            touched: Vec::new(),
            input_errors: Vec::new(),
        }
    }

    /// Starts editing `id`; only fields set afterwards are sent. Clearing a
    /// field turns the edit into a full replacement of the current record.
    pub fn edit(&mut self, id: Uuid) {
        self.editing = Some(id);
        self.draft = CreateAnimal::default();
        self.touched.clear();
    }

    /// Starts a full replacement of `animal`, prefilled with its values.
    pub fn replace(&mut self, animal: &Animal) {
        self.editing = Some(animal.id);
        self.draft = CreateAnimal::from(animal);
        self.touched = FIELDS.to_vec();
    }

    /// Sets one field from text input. Empty text clears the field.
    pub fn set_field(&mut self, field: &str, text: &str) {
        self.input_errors.retain(|(f, _)| f != field);
        let text = text.trim();
        let value = (!text.is_empty()).then(|| text.to_string());
        let parsed = match field {
            "name" => {
                self.draft.name = value;
                Ok(())
            }
            "type" => {
                self.draft.kind = value;
                Ok(())
            }
            "tag" => {
                self.draft.tag = value;
                Ok(())
            }
            "breed" => {
                self.draft.breed = value;
                Ok(())
            }
            "birth_date" => parse(value, |v| v.parse::<NaiveDate>().ok(), "expected a date like 2021-04-02")
                .map(|v| self.draft.birth_date = v),
            "weight_kg" => {
                parse(value, |v| v.parse::<f64>().ok(), "expected a number").map(|v| self.draft.weight_kg = v)
            }
            "herd_id" => {
                parse(value, |v| v.parse::<Uuid>().ok(), "expected a herd id").map(|v| self.draft.herd_id = v)
            }
            _ => Err("unknown field".to_string()),
        };
        match parsed {
            Ok(()) => {
                if let Some(name) = FIELDS.iter().copied().find(|f| *f == field) {
                    if !self.touched.contains(&name) {
                        self.touched.push(name);
                    }
                }
            }
            Err(message) => self.input_errors.push((field.to_string(), message)),
        }
    }

    pub fn has_input_errors(&self) -> bool {
        !self.input_errors.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.has_input_errors()
            || self.facade.state().error().with(Option::is_some)
            || self.facade.state().form_errors().with(|e| !e.is_empty())
    }

    pub async fn submit(&mut self) {
        if self.has_input_errors() {
            return;
        }
        let draft = self.draft.clone();
        match self.editing {
            None => self.facade.submit_create(draft).await,
            Some(id) if self.touched.len() == FIELDS.len() => self.facade.submit_update(id, draft).await,
            Some(id) if self.clears_a_field() => {
                self.facade.select(id).await;
                let current = self.facade.state().selected().get().filter(|a| a.id == id);
                if let Some(current) = current {
                    self.facade.submit_update(id, self.merged_over(&current)).await;
                }
            }
            Some(id) => self.facade.submit_patch(id, self.patch()).await,
        }
    }

    fn clears_a_field(&self) -> bool {
        let draft = &self.draft;
        self.touched.iter().any(|field| match *field {
            "name" => draft.name.is_none(),
            "type" => draft.kind.is_none(),
            "tag" => draft.tag.is_none(),
            "breed" => draft.breed.is_none(),
            "birth_date" => draft.birth_date.is_none(),
            "weight_kg" => draft.weight_kg.is_none(),
            "herd_id" => draft.herd_id.is_none(),
            _ => false,
        })
    }

    /// The current record with every touched field taken from the draft.
    fn merged_over(&self, current: &Animal) -> CreateAnimal {
        let mut merged = CreateAnimal::from(current);
        let draft = self.draft.clone();
        for field in &self.touched {
            match *field {
                "name" => merged.name = draft.name.clone(),
                "type" => merged.kind = draft.kind.clone(),
                "tag" => merged.tag = draft.tag.clone(),
                "breed" => merged.breed = draft.breed.clone(),
                "birth_date" => merged.birth_date = draft.birth_date,
                "weight_kg" => merged.weight_kg = draft.weight_kg,
                "herd_id" => merged.herd_id = draft.herd_id,
                _ => {}
            }
        }
        merged
    }

    fn patch(&self) -> UpdateAnimal {
        let touched = |name: &str| self.touched.iter().any(|t| *t == name);
        let draft = self.draft.clone();
        UpdateAnimal {
            name: draft.name.filter(|_| touched("name")),
            kind: draft.kind.filter(|_| touched("type")),
            tag: draft.tag.filter(|_| touched("tag")),
            breed: draft.breed.filter(|_| touched("breed")),
            birth_date: draft.birth_date.filter(|_| touched("birth_date")),
            weight_kg: draft.weight_kg.filter(|_| touched("weight_kg")),
            herd_id: draft.herd_id.filter(|_| touched("herd_id")),
        }
    }

    pub fn render(&self) -> String {
        let state = self.facade.state();
        let mut out = match self.editing {
            Some(id) => format!("Edit animal {id}\n"),
            None => "New animal\n".to_string(),
        };
        if let Some(notice) = self.facade.app().notice().get() {
            let _ = writeln!(out, "* {notice}");
        }
        if let Some(error) = state.error().get() {
            let _ = writeln!(out, "! {error}");
        }
        for (field, message) in &self.input_errors {
            let _ = writeln!(out, "! {field}: {message}");
        }
        for error in state.form_errors().get() {
            let _ = writeln!(out, "! {}: {}", error.field, error.message);
        }
        if let Some(saved) = state.selected().get() {
            out.push_str(&render_detail(&saved));
        }
        out
    }
}

/// Herd screen: registers herds, shows one herd's summary and moves animals
/// into it.
pub struct HerdView {
    facade: AnimalFacade,
}

impl HerdView {
    pub fn new(facade: AnimalFacade) -> Self {
        Self { facade }
    }

    pub async fn create(&self, name: &str, location: Option<&str>, capacity: Option<i64>) {
        let form = CreateHerd {
            name: Some(name.trim().to_string()).filter(|n| !n.is_empty()),
            location: location.map(str::to_string),
            capacity,
        };
        self.facade.create_herd(form).await;
    }

    pub async fn show(&self, id: Uuid) {
        self.facade.show_herd(id).await;
    }

    pub async fn move_animals(&self, herd_id: Uuid, animal_ids: Vec<Uuid>) {
        self.facade.move_to_herd(herd_id, animal_ids).await;
    }

    pub fn has_error(&self) -> bool {
        self.facade.state().error().with(Option::is_some)
            || self.facade.state().form_errors().with(|e| !e.is_empty())
    }

    pub fn render(&self) -> String {
        let state = self.facade.state();
        let mut out = String::new();
        if let Some(notice) = self.facade.app().notice().get() {
            let _ = writeln!(out, "* {notice}");
        }
        if let Some(error) = state.error().get() {
            let _ = writeln!(out, "! {error}");
        }
        for error in state.form_errors().get() {
            let _ = writeln!(out, "! {}: {}", error.field, error.message);
        }
        if let Some(herd) = state.herd_summary().get() {
            let _ = write!(out, "Herd {}: {} head", herd.name, herd.head_count);
            if let Some(capacity) = herd.capacity {
                let _ = write!(out, " (capacity {capacity})");
            }
            out.push('\n');
            let _ = writeln!(out, "  id     {}", herd.herd_id);
            if !herd.by_type.is_empty() {
                let by_type = herd
                    .by_type
                    .iter()
                    .map(|t| format!("{} {}", t.count, t.kind))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(out, "  {by_type}; {:.1} kg", herd.total_weight_kg);
            }
        }
        out
    }
}

const FIELDS: [&str; 7] = ["name", "type", "tag", "breed", "birth_date", "weight_kg", "herd_id"];

fn parse<T>(value: Option<String>, parse: impl Fn(&str) -> Option<T>, message: &str) -> Result<Option<T>, String> {
    match value {
        None => Ok(None),
        Some(text) => parse(&text).map(Some).ok_or_else(|| message.to_string()),
    }
}
