use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contracts::{
    ValidationErrors,
    api::{ErrorBody, ErrorCode},
};
use services::services::{database_validator::DatabaseValidationError, error::ServiceError};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::validation(errors)),
            ApiError::Malformed(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody::new(ErrorCode::ValidationFailed, message),
            ),
            ApiError::Service(err) => match err {
                ServiceError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, ErrorBody::new(ErrorCode::NotFound, err.to_string()))
                }
                ServiceError::DuplicateTag(_) | ServiceError::DuplicateHerdName(_) | ServiceError::HerdFull { .. } => {
                    (StatusCode::CONFLICT, ErrorBody::new(ErrorCode::Conflict, err.to_string()))
                }
                ServiceError::HerdMissing(_) | ServiceError::AnimalsMissing(_) => (
                    StatusCode::CONFLICT,
                    ErrorBody::new(ErrorCode::ReferenceMissing, err.to_string()),
                ),
                // Already logged with operation context by the service.
                ServiceError::Database(_) => internal(),
            },
            ApiError::DatabaseValidation(err) => {
                error!(error = %err, "Database validation failed");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, ErrorBody) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody::new(ErrorCode::Internal, INTERNAL_MESSAGE),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        let response = ApiResponse::<(), ErrorBody>::error_with_data(&body.message.clone(), body);
        (status, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use contracts::FieldErrorCode;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases = [
            (ServiceError::not_found("animal", Uuid::nil()), StatusCode::NOT_FOUND, ErrorCode::NotFound),
            (ServiceError::DuplicateTag("T".into()), StatusCode::CONFLICT, ErrorCode::Conflict),
            (
                ServiceError::HerdMissing(Uuid::nil()),
                StatusCode::CONFLICT,
                ErrorCode::ReferenceMissing,
            ),
            (
                ServiceError::Database(sqlx_error()),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::Internal,
            ),
        ];
        for (err, status, code) in cases {
            let (actual_status, body) = ApiError::from(err).status_and_body();
            assert_eq!(actual_status, status);
            assert_eq!(body.code, code);
        }
    }

    #[test]
    fn test_persistence_detail_is_hidden() {
        let (_, body) = ApiError::from(ServiceError::Database(sqlx_error())).status_and_body();
        assert_eq!(body.message, INTERNAL_MESSAGE);
    }

    #[test]
    fn test_validation_carries_fields() {
        let mut errors = ValidationErrors::default();
        errors.push("name", FieldErrorCode::Required, "is required");
        let (status, body) = ApiError::from(errors).status_and_body();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.fields.len(), 1);
        assert_eq!(body.fields[0].field, "name");
    }

    fn sqlx_error() -> sqlx::Error {
        sqlx::Error::PoolTimedOut
    }
}
