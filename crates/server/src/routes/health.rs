use axum::{Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError};

#[derive(Debug, Serialize, TS)]
pub struct HealthStatus {
    pub database: String,
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
}

/// GET /api/health
///
/// 503 when the schema does not match the contracts.
pub async fn health(
    State(deployment): State<Deployment>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<HealthStatus>>), ApiError> {
    let check = deployment.validator().validate().await?;
    let status = HealthStatus {
        database: check.summary(),
        migrations_applied: check.migrations_applied,
        latest_migration: check.latest_migration.clone(),
    };
    if check.is_ok() {
        Ok((StatusCode::OK, ResponseJson(ApiResponse::success(status))))
    } else {
        Ok((StatusCode::SERVICE_UNAVAILABLE, ResponseJson(ApiResponse::error(&status.database))))
    }
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/health", get(health))
}
