use std::fmt::Display;

use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("an animal with tag '{0}' already exists")]
    DuplicateTag(String),
    #[error("a herd named '{0}' already exists")]
    DuplicateHerdName(String),
    #[error("herd {0} does not exist")]
    HerdMissing(Uuid),
    #[error("animals not found: {0:?}")]
    AnimalsMissing(Vec<Uuid>),
    #[error("herd {herd_id} is at capacity ({capacity})")]
    HerdFull { herd_id: Uuid, capacity: i64 },
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        ServiceError::NotFound { entity, id }
    }

    /// Business-rule violations, as opposed to persistence failures.
    pub fn is_domain(&self) -> bool {
        !matches!(self, ServiceError::Database(_))
    }

    pub(crate) fn log(&self, operation: &'static str, entity: &'static str, key: &dyn Display) {
        match self {
            ServiceError::Database(e) => {
                error!(operation, entity, key = %key, error = %e, "Persistence failure")
            }
            other => {
                debug!(operation, entity, key = %key, error = %other, "Rejected by business rule")
            }
        }
    }
}
