//! Runtime description of the contract schemas.
//!
//! Every `schema/*.toml` file is compiled into one static [`EntitySchema`]
//! by the build script. Validation, the repository column checks and the
//! type exporter all read these statics instead of restating field lists.

use serde::Serialize;

/// Semantic type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Reference,
}

/// Validation rules attached to one field. Unset rules are `None` / empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub one_of: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSchema {
    /// Name on the wire (JSON key, query parameter).
    pub name: &'static str,
    /// Rust identifier and column name.
    pub column: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
    pub filterable: bool,
    /// Entity referenced by a `reference` field.
    pub references: Option<&'static str>,
    pub rules: Rules,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntitySchema {
    pub name: &'static str,
    pub table: &'static str,
    pub collection: &'static str,
    pub fields: &'static [FieldSchema],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Every persisted column in table order: key, schema fields, timestamps.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::with_capacity(self.fields.len() + 3);
        columns.push("id");
        columns.extend(self.fields.iter().map(|f| f.column));
        columns.push("created_at");
        columns.push("updated_at");
        columns
    }
}

/// Ties together the generated types of one entity.
pub trait Contract: Sized {
    /// Wire shape for create and full replace.
    type Create;
    /// Wire shape for partial update.
    type Update;
    /// Validated, complete input.
    type New: Clone + PartialEq;
    /// Validated partial input.
    type Patch;
    /// Query-string filter.
    type Filter;

    const SCHEMA: &'static EntitySchema;

    fn id(&self) -> uuid::Uuid;
}
