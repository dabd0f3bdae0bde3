//! Request and response shapes shared by the server and its clients that are
//! not tied to a single entity schema.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::validation::{FieldError, FieldErrorCode, ValidationErrors};

pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 100;
pub const MAX_TRANSFER: usize = 500;

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Resolved paging window; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Validates the raw `page` / `per_page` query values, applying defaults.
    pub fn resolve(page: Option<u32>, per_page: Option<u32>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if page == 0 {
            errors.push("page", FieldErrorCode::OutOfRange, "must be at least 1");
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            errors.push(
                "per_page",
                FieldErrorCode::OutOfRange,
                format!("must be between 1 and {MAX_PER_PAGE}"),
            );
        }
        errors.into_result()?;
        Ok(Self { page, per_page })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    ValidationFailed,
    NotFound,
    Conflict,
    ReferenceMissing,
    Internal,
}

/// Error payload carried in `ApiResponse::error_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<FieldError>,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            code: ErrorCode::ValidationFailed,
            message: "request failed validation".to_string(),
            fields: errors.errors,
        }
    }
}

/// Moves a batch of animals into a herd.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct TransferAnimals {
    #[serde(default)]
    pub animal_ids: Vec<Uuid>,
}

impl TransferAnimals {
    pub fn validate(self) -> Result<Vec<Uuid>, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.animal_ids.is_empty() {
            errors.push("animal_ids", FieldErrorCode::Required, "must list at least one animal");
        }
        if self.animal_ids.len() > MAX_TRANSFER {
            errors.push(
                "animal_ids",
                FieldErrorCode::TooLong,
                format!("must list at most {MAX_TRANSFER} animals"),
            );
        }
        errors.into_result()?;
        let mut ids = self.animal_ids;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
}

/// Aggregates over the animals currently in one herd.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct HerdSummary {
    pub herd_id: Uuid,
    pub name: String,
    pub head_count: i64,
    pub capacity: Option<i64>,
    pub total_weight_kg: f64,
    pub by_type: Vec<TypeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct TransferResult {
    pub herd_id: Uuid,
    pub moved: u64,
}
