use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::schema::FieldSchema;

/// Machine-readable reason a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldErrorCode {
    Required,
    TooShort,
    TooLong,
    OutOfRange,
    NotAllowed,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct FieldError {
    pub field: String,
    pub code: FieldErrorCode,
    pub message: String,
}

/// Every rule violation found in one payload.
#[derive(Debug, Clone, Default, PartialEq, Error, Serialize, Deserialize, TS)]
#[error("validation failed: {}", summary(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn push(&mut self, field: &str, code: FieldErrorCode, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            code,
            message: message.into(),
        });
    }

    /// Records a `required` error when the value is missing; checks the value otherwise.
    pub fn required<T: FieldValue>(&mut self, field: &FieldSchema, value: Option<T>) -> Option<T> {
        match value {
            Some(value) => {
                value.check(field, self);
                Some(value)
            }
            None => {
                self.push(field.name, FieldErrorCode::Required, "is required");
                None
            }
        }
    }

    pub fn optional<T: FieldValue>(&mut self, field: &FieldSchema, value: Option<T>) -> Option<T> {
        if let Some(value) = &value {
            value.check(field, self);
        }
        value
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// A value type that can be checked against a field's rules.
pub trait FieldValue {
    fn check(&self, field: &FieldSchema, errors: &mut ValidationErrors);
}

impl FieldValue for String {
    fn check(&self, field: &FieldSchema, errors: &mut ValidationErrors) {
        let rules = &field.rules;
        let len = self.chars().count();
        if let Some(min) = rules.min_length.filter(|min| len < *min) {
            errors.push(
                field.name,
                FieldErrorCode::TooShort,
                format!("must be at least {min} characters"),
            );
        }
        if let Some(max) = rules.max_length.filter(|max| len > *max) {
            errors.push(
                field.name,
                FieldErrorCode::TooLong,
                format!("must be at most {max} characters"),
            );
        }
        if !rules.one_of.is_empty() && !rules.one_of.contains(&self.as_str()) {
            errors.push(
                field.name,
                FieldErrorCode::NotAllowed,
                format!("must be one of: {}", rules.one_of.join(", ")),
            );
        }
    }
}

fn check_range(value: f64, field: &FieldSchema, errors: &mut ValidationErrors) {
    let rules = &field.rules;
    let below = rules.min.is_some_and(|min| value < min);
    let above = rules.max.is_some_and(|max| value > max);
    if below || above || value.is_nan() {
        let message = match (rules.min, rules.max) {
            (Some(min), Some(max)) => format!("must be between {min} and {max}"),
            (Some(min), None) => format!("must be at least {min}"),
            (None, Some(max)) => format!("must be at most {max}"),
            (None, None) => "must be a number".to_string(),
        };
        errors.push(field.name, FieldErrorCode::OutOfRange, message);
    }
}

impl FieldValue for f64 {
    fn check(&self, field: &FieldSchema, errors: &mut ValidationErrors) {
        check_range(*self, field, errors);
    }
}

impl FieldValue for i64 {
    fn check(&self, field: &FieldSchema, errors: &mut ValidationErrors) {
        check_range(*self as f64, field, errors);
    }
}

impl FieldValue for bool {
    fn check(&self, _field: &FieldSchema, _errors: &mut ValidationErrors) {}
}

impl FieldValue for NaiveDate {
    fn check(&self, _field: &FieldSchema, _errors: &mut ValidationErrors) {}
}

impl FieldValue for Uuid {
    fn check(&self, field: &FieldSchema, errors: &mut ValidationErrors) {
        if self.is_nil() {
            errors.push(field.name, FieldErrorCode::Invalid, "must not be the nil id");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, Rules};

    const NAME: FieldSchema = FieldSchema {
        name: "name",
        column: "name",
        kind: FieldKind::String,
        required: true,
        unique: false,
        filterable: false,
        references: None,
        rules: Rules {
            min_length: Some(2),
            max_length: Some(4),
            min: None,
            max: None,
            one_of: &[],
        },
    };

    const WEIGHT: FieldSchema = FieldSchema {
        name: "weight",
        column: "weight",
        kind: FieldKind::Float,
        required: false,
        unique: false,
        filterable: false,
        references: None,
        rules: Rules {
            min_length: None,
            max_length: None,
            min: Some(0.0),
            max: Some(10.0),
            one_of: &[],
        },
    };

    #[test]
    fn test_required_missing_is_reported() {
        let mut errors = ValidationErrors::default();
        let value: Option<String> = errors.required(&NAME, None);
        assert!(value.is_none());
        assert_eq!(errors.errors[0].code, FieldErrorCode::Required);
        assert!(errors.has("name"));
    }

    #[test]
    fn test_string_length_bounds_count_chars() {
        let mut errors = ValidationErrors::default();
        errors.required(&NAME, Some("é".to_string()));
        errors.required(&NAME, Some("ééééé".to_string()));
        errors.required(&NAME, Some("éé".to_string()));
        let codes: Vec<_> = errors.errors.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![FieldErrorCode::TooShort, FieldErrorCode::TooLong]);
    }

    #[test]
    fn test_range_rejects_nan_and_out_of_bounds() {
        let mut errors = ValidationErrors::default();
        errors.optional(&WEIGHT, Some(f64::NAN));
        errors.optional(&WEIGHT, Some(11.0));
        errors.optional(&WEIGHT, Some(10.0));
        errors.optional::<f64>(&WEIGHT, None);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors[1].message, "must be between 0 and 10");
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.push("name", FieldErrorCode::Required, "is required");
        errors.push("type", FieldErrorCode::NotAllowed, "must be one of: cow");
        assert_eq!(
            errors.to_string(),
            "validation failed: name: is required; type: must be one of: cow"
        );
        assert!(errors.into_result().is_err());
    }
}
