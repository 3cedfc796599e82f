//! Farmer onboarding use-cases.

use crate::model::farmer::{Farmer, NewFarmer};
use crate::model::FarmerId;
use crate::repo::farmer_repo::FarmerRepository;
use crate::repo::{Entity, RepoError, RepoResult};
use log::info;

/// Use-case service wrapper for farmer onboarding and lookup.
pub struct FarmerService<R: FarmerRepository> {
    repo: R,
}

impl<R: FarmerRepository> FarmerService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Onboards one farmer. Phone numbers are normalized before the
    /// uniqueness check, so `0711 000 000` and `0711000000` clash.
    pub fn create_farmer(&self, farmer: &NewFarmer) -> RepoResult<Farmer> {
        let created = self.repo.create_farmer(farmer)?;
        info!(
            "event=farmer_create module=service status=ok farmer_id={}",
            created.id
        );
        Ok(created)
    }

    pub fn get_farmer(&self, id: FarmerId) -> RepoResult<Farmer> {
        self.repo.get_farmer(id)?.ok_or_else(|| RepoError::NotFound {
            entity: Entity::Farmer,
            key: id.to_string(),
        })
    }

    pub fn list_farmers(&self) -> RepoResult<Vec<Farmer>> {
        self.repo.list_farmers()
    }
}
