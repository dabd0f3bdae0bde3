use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::{JsonRejection, PathRejection, QueryRejection}},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use contracts::{
    CreateHerd, Herd, HerdFilter, UpdateHerd,
    api::{HerdSummary, Page, TransferAnimals, TransferResult},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

type HerdResponse = ResponseJson<ApiResponse<Herd>>;

/// GET /api/herds
pub async fn list_herds(
    State(deployment): State<Deployment>,
    query: Result<Query<HerdFilter>, QueryRejection>,
) -> Result<ResponseJson<ApiResponse<Page<Herd>>>, ApiError> {
    let Query(filter) = query?;
    let page = filter.validate()?;
    let herds = deployment.herds().list(&filter, page).await?;
    Ok(ResponseJson(ApiResponse::success(herds)))
}

/// POST /api/herds
pub async fn create_herd(
    State(deployment): State<Deployment>,
    payload: Result<Json<CreateHerd>, JsonRejection>,
) -> Result<(StatusCode, HerdResponse), ApiError> {
    let Json(payload) = payload?;
    let herd = deployment.herds().create(payload.validate()?).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(herd))))
}

/// GET /api/herds/{id}
pub async fn get_herd(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<HerdResponse, ApiError> {
    let Path(id) = id?;
    let herd = deployment.herds().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(herd)))
}

/// PUT /api/herds/{id}
pub async fn replace_herd(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateHerd>, JsonRejection>,
) -> Result<HerdResponse, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let herd = deployment.herds().replace(id, payload.validate()?).await?;
    Ok(ResponseJson(ApiResponse::success(herd)))
}

/// PATCH /api/herds/{id}
pub async fn patch_herd(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateHerd>, JsonRejection>,
) -> Result<HerdResponse, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let herd = deployment.herds().patch(id, payload.validate()?).await?;
    Ok(ResponseJson(ApiResponse::success(herd)))
}

/// DELETE /api/herds/{id}
/// Animals in the herd are kept and detached.
pub async fn delete_herd(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let Path(id) = id?;
    deployment.herds().delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/herds/{id}/summary
pub async fn herd_summary(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<ResponseJson<ApiResponse<HerdSummary>>, ApiError> {
    let Path(id) = id?;
    let summary = deployment.herds().summary(id).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// POST /api/herds/{id}/animals
/// Moves all listed animals into the herd, or none of them.
pub async fn transfer_animals(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TransferAnimals>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<TransferResult>>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let result = deployment.herds().transfer_animals(id, payload.validate()?).await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/herds", get(list_herds).post(create_herd))
        .route(
            "/herds/{id}",
            get(get_herd).put(replace_herd).patch(patch_herd).delete(delete_herd),
        )
        .route("/herds/{id}/summary", get(herd_summary))
        .route("/herds/{id}/animals", post(transfer_animals))
}
