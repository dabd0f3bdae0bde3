//! Data access over the HTTP API.

use async_trait::async_trait;
use contracts::{
    Animal, AnimalFilter, CreateAnimal, CreateHerd, FieldError, Herd, HerdFilter, UpdateAnimal,
    ValidationErrors,
    api::{ErrorBody, ErrorCode, HerdSummary, Page, TransferAnimals, TransferResult},
};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;
use utils::response::ApiResponse;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiClientError {
    #[error("{message}")]
    Validation { message: String, fields: Vec<FieldError> },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response broke the contract: {0}")]
    Contract(ValidationErrors),
}

impl From<reqwest::Error> for ApiClientError {
    fn from(err: reqwest::Error) -> Self {
        ApiClientError::Transport(err.to_string())
    }
}

impl From<ErrorBody> for ApiClientError {
    fn from(body: ErrorBody) -> Self {
        match body.code {
            ErrorCode::ValidationFailed => ApiClientError::Validation {
                message: body.message,
                fields: body.fields,
            },
            ErrorCode::NotFound => ApiClientError::NotFound(body.message),
            ErrorCode::Conflict | ErrorCode::ReferenceMissing => ApiClientError::Conflict(body.message),
            ErrorCode::Internal => ApiClientError::Server(body.message),
        }
    }
}

#[async_trait]
pub trait AnimalApi: Send + Sync {
    async fn list_animals(&self, filter: &AnimalFilter) -> Result<Page<Animal>, ApiClientError>;
    async fn get_animal(&self, id: Uuid) -> Result<Animal, ApiClientError>;
    async fn create_animal(&self, body: &CreateAnimal) -> Result<Animal, ApiClientError>;
    async fn replace_animal(&self, id: Uuid, body: &CreateAnimal) -> Result<Animal, ApiClientError>;
    async fn patch_animal(&self, id: Uuid, body: &UpdateAnimal) -> Result<Animal, ApiClientError>;
    async fn delete_animal(&self, id: Uuid) -> Result<(), ApiClientError>;
}

#[async_trait]
pub trait HerdApi: Send + Sync {
    async fn list_herds(&self, filter: &HerdFilter) -> Result<Page<Herd>, ApiClientError>;
    async fn create_herd(&self, body: &CreateHerd) -> Result<Herd, ApiClientError>;
    async fn herd_summary(&self, id: Uuid) -> Result<HerdSummary, ApiClientError>;
    async fn transfer_animals(&self, herd_id: Uuid, body: &TransferAnimals) -> Result<TransferResult, ApiClientError>;
}

/// Entities arriving from the server are checked against the same rules the
/// server applies to requests.
fn checked_animal(animal: Animal) -> Result<Animal, ApiClientError> {
    CreateAnimal::from(&animal)
        .validate()
        .map_err(ApiClientError::Contract)?;
    Ok(animal)
}

fn checked_herd(herd: Herd) -> Result<Herd, ApiClientError> {
    CreateHerd::from(&herd).validate().map_err(ApiClientError::Contract)?;
    Ok(herd)
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}/api{path}", self.base_url))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiClientError> {
        self.envelope::<T>(request)
            .await?
            .ok_or_else(|| ApiClientError::Server("response carried no data".to_string()))
    }

    /// For endpoints whose success carries no data.
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), ApiClientError> {
        self.envelope::<serde::de::IgnoredAny>(request).await.map(|_| ())
    }

    /// Decodes the envelope; `Ok` holds the data of a successful response.
    async fn envelope<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ApiClientError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let envelope: ApiResponse<T, ErrorBody> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(%status, error = %e, "Undecodable response body");
                return Err(unexpected(status));
            }
        };
        if envelope.is_success() {
            return Ok(envelope.into_data());
        }
        let message = envelope.message().map(str::to_string);
        match envelope.into_error_data() {
            Some(body) => Err(body.into()),
            None => Err(ApiClientError::Server(
                message.unwrap_or_else(|| status.to_string()),
            )),
        }
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(self.request(method, path).json(body)).await
    }
}

fn unexpected(status: StatusCode) -> ApiClientError {
    match status {
        StatusCode::NOT_FOUND => ApiClientError::NotFound(status.to_string()),
        status if status.is_server_error() => ApiClientError::Server(status.to_string()),
        status => ApiClientError::Transport(format!("unexpected response ({status})")),
    }
}

#[async_trait]
impl AnimalApi for HttpClient {
    async fn list_animals(&self, filter: &AnimalFilter) -> Result<Page<Animal>, ApiClientError> {
        let page: Page<Animal> = self.send(self.request(Method::GET, "/animals").query(filter)).await?;
        let items = page
            .items
            .into_iter()
            .map(checked_animal)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page { items, ..page })
    }

    async fn get_animal(&self, id: Uuid) -> Result<Animal, ApiClientError> {
        let animal = self.send(self.request(Method::GET, &format!("/animals/{id}"))).await?;
        checked_animal(animal)
    }

    async fn create_animal(&self, body: &CreateAnimal) -> Result<Animal, ApiClientError> {
        checked_animal(self.send_json(Method::POST, "/animals", body).await?)
    }

    async fn replace_animal(&self, id: Uuid, body: &CreateAnimal) -> Result<Animal, ApiClientError> {
        checked_animal(self.send_json(Method::PUT, &format!("/animals/{id}"), body).await?)
    }

    async fn patch_animal(&self, id: Uuid, body: &UpdateAnimal) -> Result<Animal, ApiClientError> {
        checked_animal(self.send_json(Method::PATCH, &format!("/animals/{id}"), body).await?)
    }

    async fn delete_animal(&self, id: Uuid) -> Result<(), ApiClientError> {
        self.send_unit(self.request(Method::DELETE, &format!("/animals/{id}"))).await
    }
}

#[async_trait]
impl HerdApi for HttpClient {
    async fn list_herds(&self, filter: &HerdFilter) -> Result<Page<Herd>, ApiClientError> {
        let page: Page<Herd> = self.send(self.request(Method::GET, "/herds").query(filter)).await?;
        let items = page
            .items
            .into_iter()
            .map(checked_herd)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page { items, ..page })
    }

    async fn create_herd(&self, body: &CreateHerd) -> Result<Herd, ApiClientError> {
        checked_herd(self.send_json(Method::POST, "/herds", body).await?)
    }

    async fn herd_summary(&self, id: Uuid) -> Result<HerdSummary, ApiClientError> {
        self.send(self.request(Method::GET, &format!("/herds/{id}/summary"))).await
    }

    async fn transfer_animals(&self, herd_id: Uuid, body: &TransferAnimals) -> Result<TransferResult, ApiClientError> {
        self.send_json(Method::POST, &format!("/herds/{herd_id}/animals"), body).await
    }
}
