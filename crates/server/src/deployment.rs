use std::sync::Arc;

use db::DBService;
use services::services::{animal::AnimalService, database_validator::DatabaseValidator, herd::HerdService};

/// Shared handler state: the database and the services built on it.
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    animals: Arc<AnimalService>,
    herds: Arc<HerdService>,
}

impl Deployment {
    pub fn new(db: DBService) -> Self {
        Self {
            animals: Arc::new(AnimalService::new(db.pool.clone())),
            herds: Arc::new(HerdService::new(db.pool.clone())),
            db,
        }
    }

    pub fn animals(&self) -> &AnimalService {
        &self.animals
    }

    pub fn herds(&self) -> &HerdService {
        &self.herds
    }

    pub fn validator(&self) -> DatabaseValidator {
        DatabaseValidator::new(self.db.pool.clone())
    }
}
