//! Goat registration and pipeline queries.
//!
//! # Responsibility
//! - Assign each new goat a rizara id, retrying on collisions.
//! - Expose status/farmer listings and pipeline counts.
//!
//! # Invariants
//! - Only `DuplicateRizaraId` is retried; every other failure returns at once.
//! - At most `max_attempts` candidates are tried per registration.

use crate::model::goat::{Goat, GoatStatus, NewGoat};
use crate::model::{FarmerId, GoatId};
use crate::repo::goat_repo::{GoatRepository, GoatStatusCounts};
use crate::repo::{Entity, RepoError, RepoResult};
use crate::service::rizara_id::{
    next_sequence, FarmerSequenceIdGenerator, RizaraIdGenerator, RizaraIdRequest,
    DEFAULT_MAX_ATTEMPTS,
};
use chrono::{Datelike, Utc};
use log::{info, warn};

/// Use-case service wrapper for goat registration and lookup.
pub struct GoatService<R: GoatRepository, G: RizaraIdGenerator = FarmerSequenceIdGenerator> {
    repo: R,
    generator: G,
    max_attempts: u32,
}

impl<R: GoatRepository> GoatService<R> {
    /// Creates a service with the default id format and retry bound.
    pub fn new(repo: R) -> Self {
        Self::with_generator(repo, FarmerSequenceIdGenerator, DEFAULT_MAX_ATTEMPTS)
    }
}

impl<R: GoatRepository, G: RizaraIdGenerator> GoatService<R, G> {
    /// Creates a service with a custom generator. `max_attempts` is at least 1.
    pub fn with_generator(repo: R, generator: G, max_attempts: u32) -> Self {
        Self {
            repo,
            generator,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Registers an `on_farm` goat under `farmer_id`.
    ///
    /// # Errors
    /// - `UnknownFarmer` when the farmer does not exist.
    /// - `IdGenerationFailed` when every candidate collided.
    pub fn create_goat(&self, farmer_id: FarmerId, goat: &NewGoat) -> RepoResult<Goat> {
        let existing = self.repo.rizara_ids_for_farmer(farmer_id)?;
        let sequence = next_sequence(farmer_id, &existing);
        let year = Utc::now().year();

        for attempt in 0..self.max_attempts {
            let candidate = self.generator.candidate(&RizaraIdRequest {
                farmer_id,
                year,
                sequence,
                attempt,
            });
            match self.repo.create_goat(farmer_id, goat, &candidate) {
                Ok(created) => {
                    info!(
                        "event=goat_create module=service status=ok farmer_id={farmer_id} goat_id={} attempts={}",
                        created.id,
                        attempt + 1
                    );
                    return Ok(created);
                }
                Err(RepoError::DuplicateRizaraId(_)) => {
                    warn!(
                        "event=goat_create module=service status=retry farmer_id={farmer_id} attempt={}",
                        attempt + 1
                    );
                }
                Err(err) => return Err(err),
            }
        }

        warn!(
            "event=goat_create module=service status=error farmer_id={farmer_id} error_code=id_generation_failed attempts={}",
            self.max_attempts
        );
        Err(RepoError::IdGenerationFailed {
            farmer_id,
            attempts: self.max_attempts,
        })
    }

    pub fn get_goat(&self, id: GoatId) -> RepoResult<Goat> {
        self.repo.get_goat(id)?.ok_or_else(|| RepoError::NotFound {
            entity: Entity::Goat,
            key: id.to_string(),
        })
    }

    /// Newest registrations first.
    pub fn list_goats_by_status(&self, status: GoatStatus) -> RepoResult<Vec<Goat>> {
        self.repo.list_goats_by_status(status)
    }

    pub fn list_goats_by_farmer(&self, farmer_id: FarmerId) -> RepoResult<Vec<Goat>> {
        self.repo.list_goats_by_farmer(farmer_id)
    }

    pub fn count_goats_by_status(&self) -> RepoResult<GoatStatusCounts> {
        self.repo.count_goats_by_status()
    }
}
