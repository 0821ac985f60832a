//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod identity;
pub mod reports;
pub mod sweeper;

use crate::{
    config::{AuthConfig, StorageConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub identity: identity::IdentityService,
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, storage_config: StorageConfig) -> Self {
        Self {
            identity: identity::IdentityService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone(), storage_config),
            circulation: circulation::CirculationService::new(repository.clone()),
            reports: reports::ReportsService::new(repository),
        }
    }
}
