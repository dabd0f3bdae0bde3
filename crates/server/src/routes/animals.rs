use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::{JsonRejection, PathRejection, QueryRejection}},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use contracts::{Animal, AnimalFilter, CreateAnimal, UpdateAnimal, api::Page};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

type AnimalResponse = ResponseJson<ApiResponse<Animal>>;

/// GET /api/animals
pub async fn list_animals(
    State(deployment): State<Deployment>,
    query: Result<Query<AnimalFilter>, QueryRejection>,
) -> Result<ResponseJson<ApiResponse<Page<Animal>>>, ApiError> {
    let Query(filter) = query?;
    let page = filter.validate()?;
    let animals = deployment.animals().list(&filter, page).await?;
    Ok(ResponseJson(ApiResponse::success(animals)))
}

/// POST /api/animals
pub async fn create_animal(
    State(deployment): State<Deployment>,
    payload: Result<Json<CreateAnimal>, JsonRejection>,
) -> Result<(StatusCode, AnimalResponse), ApiError> {
    let Json(payload) = payload?;
    let data = payload.validate()?;
    let animal = deployment.animals().create(data).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(animal))))
}

/// GET /api/animals/{id}
pub async fn get_animal(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<AnimalResponse, ApiError> {
    let Path(id) = id?;
    let animal = deployment.animals().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(animal)))
}

/// PUT /api/animals/{id}
///
/// Full replacement: the body must carry every required field.
pub async fn replace_animal(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateAnimal>, JsonRejection>,
) -> Result<AnimalResponse, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let data = payload.validate()?;
    let animal = deployment.animals().replace(id, data).await?;
    Ok(ResponseJson(ApiResponse::success(animal)))
}

/// PATCH /api/animals/{id}
pub async fn patch_animal(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateAnimal>, JsonRejection>,
) -> Result<AnimalResponse, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let animal = deployment.animals().patch(id, payload.validate()?).await?;
    Ok(ResponseJson(ApiResponse::success(animal)))
}

/// DELETE /api/animals/{id}
pub async fn delete_animal(
    State(deployment): State<Deployment>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let Path(id) = id?;
    deployment.animals().delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/animals", get(list_animals).post(create_animal))
        .route(
            "/animals/{id}",
            get(get_animal)
                .put(replace_animal)
                .patch(patch_animal)
                .delete(delete_animal),
        )
}
