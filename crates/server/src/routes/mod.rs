use axum::Router;

use crate::Deployment;

pub mod animals;
pub mod health;
pub mod herds;

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .merge(health::router(deployment))
        .merge(animals::router(deployment))
        .merge(herds::router(deployment))
}
