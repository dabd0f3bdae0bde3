//! Client side of the livestock tracker.
//!
//! Layering, from the outside in: components own a facade; the facade drives
//! the frontend service and writes the store; the store exposes read-only
//! signals that components render.

pub mod api;
pub mod component;
pub mod facade;
pub mod feature;
pub mod service;
pub mod signal;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AnimalApi, ApiClientError, HerdApi, HttpClient};
pub use component::{AnimalFormView, AnimalListView, HerdView};
pub use facade::AnimalFacade;
pub use feature::LivestockFeature;
pub use service::LivestockService;
pub use store::{AnimalStore, AppStore, Operation, Phase};
