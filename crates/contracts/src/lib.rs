//! Contract definitions shared by every layer of the livestock tracker.
//!
//! Entity types are generated at build time from `schema/*.toml`; the
//! backend validates requests and the client validates forms and responses
//! with the same generated `validate` methods.

pub mod api;
pub mod schema;
pub mod validation;

mod generated {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Serialize};
    use ts_rs::TS;
    use uuid::Uuid;

    use crate::{
        api::PageRequest,
        schema::{Contract, EntitySchema, FieldKind, FieldSchema, Rules},
        validation::ValidationErrors,
    };

    include!(concat!(env!("OUT_DIR"), "/generated.rs"));
}

pub use generated::*;
pub use schema::{Contract, EntitySchema, FieldKind, FieldSchema};
pub use validation::{FieldError, FieldErrorCode, ValidationErrors};

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn bessy() -> Animal {
        Animal {
            id: Uuid::new_v4(),
            name: "Bessy".to_string(),
            kind: "cow".to_string(),
            tag: Some("UK-0042".to_string()),
            breed: Some("Jersey".to_string()),
            birth_date: NaiveDate::from_ymd_opt(2021, 4, 2),
            weight_kg: Some(412.5),
            herd_id: Some(Uuid::new_v4()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_entity_uses_wire_names() {
        let value = serde_json::to_value(bessy()).unwrap();
        assert_eq!(value["type"], "cow");
        assert!(value.get("kind").is_none());
        assert_eq!(value["birth_date"], "2021-04-02");
    }

    #[test]
    fn test_entity_json_round_trip() {
        let animal = bessy();
        let json = serde_json::to_string(&animal).unwrap();
        let back: Animal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, animal);
    }

    #[test]
    fn test_entity_dto_round_trip_keeps_schema_fields() {
        let animal = bessy();
        let dto = CreateAnimal::from(&animal);
        let wire = serde_json::to_string(&dto).unwrap();
        let decoded: CreateAnimal = serde_json::from_str(&wire).unwrap();
        let validated = decoded.validate().unwrap();
        assert_eq!(validated, NewAnimal::from(&animal));
    }

    #[test]
    fn test_omitting_any_required_field_fails_validation() {
        let full = json!({ "name": "Bessy", "type": "cow", "tag": "A1" });
        for field in ANIMAL_SCHEMA.required_fields() {
            let mut body = full.clone();
            body.as_object_mut().unwrap().remove(field.name);
            let dto: CreateAnimal = serde_json::from_value(body).unwrap();
            let errors = dto.validate().unwrap_err();
            assert!(errors.has(field.name), "{} should be required", field.name);
            assert_eq!(errors.errors[0].code, FieldErrorCode::Required);
        }
        for field in HERD_SCHEMA.required_fields() {
            let errors = CreateHerd::default().validate().unwrap_err();
            assert!(errors.has(field.name));
        }
    }

    #[test]
    fn test_create_reports_every_violation() {
        let dto: CreateAnimal = serde_json::from_value(json!({
            "name": "",
            "type": "dragon",
            "weight_kg": -3.0
        }))
        .unwrap();
        let errors = dto.validate().unwrap_err();
        let fields: Vec<_> = errors.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "type", "weight_kg"]);
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let animal = bessy();
        let patch = UpdateAnimal {
            weight_kg: Some(430.0),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert!(!patch.is_empty());
        let updated = patch.apply(NewAnimal::from(&animal));
        assert_eq!(updated.weight_kg, Some(430.0));
        assert_eq!(updated.name, "Bessy");
        assert_eq!(updated.tag.as_deref(), Some("UK-0042"));

        assert!(UpdateAnimal::default().validate().unwrap().is_empty());
        assert!(
            UpdateAnimal {
                kind: Some("unicorn".to_string()),
                ..Default::default()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_filter_validation_checks_values_and_paging() {
        let filter = AnimalFilter {
            kind: Some("goat".to_string()),
            page: Some(2),
            ..Default::default()
        };
        assert_eq!(filter.validate().unwrap().page, 2);

        let filter = AnimalFilter {
            kind: Some("dragon".to_string()),
            per_page: Some(0),
            ..Default::default()
        };
        let errors = filter.validate().unwrap_err();
        assert!(errors.has("type"));
        assert!(errors.has("per_page"));

        assert!(HerdFilter::default().validate().is_ok());
    }

    #[test]
    fn test_schema_metadata() {
        assert_eq!(SCHEMAS.len(), 2);
        assert_eq!(<Animal as Contract>::SCHEMA.table, "animals");
        let kind = ANIMAL_SCHEMA.field("type").unwrap();
        assert_eq!(kind.column, "kind");
        assert!(kind.filterable);
        assert_eq!(
            ANIMAL_SCHEMA.field("herd_id").unwrap().references,
            Some("Herd")
        );
        assert_eq!(
            HERD_SCHEMA.columns(),
            vec!["id", "name", "location", "capacity", "created_at", "updated_at"]
        );
    }

    #[test]
    fn test_declarations_cover_entities() {
        let decls = generated_declarations();
        assert!(decls.iter().any(|d| d.contains("type Animal =")));
        assert!(decls.iter().any(|d| d.contains("CreateHerd")));
    }
}
