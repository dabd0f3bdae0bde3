use std::sync::Arc;

use crate::{
    api::{AnimalApi, HerdApi, HttpClient},
    facade::AnimalFacade,
    service::LivestockService,
    store::{AnimalStore, AppStore},
};

/// Composition root of the livestock screens.
///
/// Owns the feature-scoped store and hands out one facade per UI surface.
/// Facades share the store but never their request tracking.
pub struct LivestockFeature {
    store: Arc<AnimalStore>,
    service: LivestockService,
}

impl LivestockFeature {
    pub fn new(animals: Arc<dyn AnimalApi>, herds: Arc<dyn HerdApi>) -> Self {
        Self {
            store: Arc::new(AnimalStore::new()),
            service: LivestockService::new(animals, herds),
        }
    }

    pub fn over_http(client: HttpClient) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client)
    }

    pub fn facade(&self) -> AnimalFacade {
        self.facade_with(AppStore::global())
    }

    pub(crate) fn facade_with(&self, app: &'static AppStore) -> AnimalFacade {
        AnimalFacade::new(self.store.clone(), self.service.clone(), app)
    }

    pub fn store(&self) -> &AnimalStore {
        &self.store
    }

    pub fn service(&self) -> &LivestockService {
        &self.service
    }
}
