//! Aggregation and processing batch use-cases.
//!
//! # Responsibility
//! - Open, fill and lock batches of both kinds.
//! - Assemble the batch-with-members read model.
//!
//! # Invariants
//! - Admission and locking semantics live in the repository transaction;
//!   this layer adds lookups and diagnostics only.

use crate::model::batch::{
    AggregationBatch, BatchKind, BatchWithMembers, NewAggregationBatch, NewProcessingBatch,
    ProcessingBatch,
};
use crate::model::goat::{AggregationIntake, Goat};
use crate::model::{BatchId, GoatId};
use crate::repo::batch_repo::BatchRepository;
use crate::repo::{Entity, RepoError, RepoResult};
use log::{info, warn};

/// Use-case service wrapper for batch lifecycle and membership.
pub struct BatchService<R: BatchRepository> {
    repo: R,
}

impl<R: BatchRepository> BatchService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn open_aggregation_batch(
        &self,
        batch: &NewAggregationBatch,
    ) -> RepoResult<AggregationBatch> {
        let created = self.repo.open_aggregation_batch(batch)?;
        info!(
            "event=batch_open module=service status=ok kind=aggregation batch_id={}",
            created.id
        );
        Ok(created)
    }

    /// Moves an `on_farm` goat into an open aggregation batch.
    ///
    /// # Errors
    /// Checked in order: `UnknownBatch`, `BatchLocked`, `UnknownGoat`,
    /// `GoatAlreadyInBatch`, `InvalidStatusTransition`.
    pub fn add_goat_to_aggregation(
        &self,
        batch_id: BatchId,
        goat_id: GoatId,
        intake: &AggregationIntake,
    ) -> RepoResult<Goat> {
        let result = self.repo.add_goat_to_aggregation(batch_id, goat_id, intake);
        log_admission(BatchKind::Aggregation, batch_id, goat_id, &result);
        result
    }

    /// Locks the batch. Locking twice fails with `AlreadyLocked`.
    pub fn lock_aggregation_batch(&self, batch_id: BatchId) -> RepoResult<AggregationBatch> {
        let locked = self.repo.lock_aggregation_batch(batch_id)?;
        info!("event=batch_lock module=service status=ok kind=aggregation batch_id={batch_id}");
        Ok(locked)
    }

    pub fn get_aggregation_batch(&self, batch_id: BatchId) -> RepoResult<AggregationBatch> {
        self.repo
            .get_aggregation_batch(batch_id)?
            .ok_or_else(|| not_found(BatchKind::Aggregation, batch_id))
    }

    pub fn get_aggregation_batch_with_members(
        &self,
        batch_id: BatchId,
    ) -> RepoResult<BatchWithMembers<AggregationBatch>> {
        let batch = self.get_aggregation_batch(batch_id)?;
        let members = self.repo.aggregation_members(batch_id)?;
        Ok(BatchWithMembers { batch, members })
    }

    pub fn list_aggregation_batches(&self, open_only: bool) -> RepoResult<Vec<AggregationBatch>> {
        self.repo.list_aggregation_batches(open_only)
    }

    pub fn aggregation_batch_for_goat(
        &self,
        goat_id: GoatId,
    ) -> RepoResult<Option<AggregationBatch>> {
        self.repo.aggregation_batch_for_goat(goat_id)
    }

    pub fn open_processing_batch(&self, batch: &NewProcessingBatch) -> RepoResult<ProcessingBatch> {
        let created = self.repo.open_processing_batch(batch)?;
        info!(
            "event=batch_open module=service status=ok kind=processing batch_id={}",
            created.id
        );
        Ok(created)
    }

    /// Moves an `aggregated` goat into an open processing batch.
    ///
    /// Same error ordering as [`Self::add_goat_to_aggregation`].
    pub fn add_goat_to_processing(&self, batch_id: BatchId, goat_id: GoatId) -> RepoResult<Goat> {
        let result = self.repo.add_goat_to_processing(batch_id, goat_id);
        log_admission(BatchKind::Processing, batch_id, goat_id, &result);
        result
    }

    pub fn lock_processing_batch(&self, batch_id: BatchId) -> RepoResult<ProcessingBatch> {
        let locked = self.repo.lock_processing_batch(batch_id)?;
        info!("event=batch_lock module=service status=ok kind=processing batch_id={batch_id}");
        Ok(locked)
    }

    pub fn get_processing_batch(&self, batch_id: BatchId) -> RepoResult<ProcessingBatch> {
        self.repo
            .get_processing_batch(batch_id)?
            .ok_or_else(|| not_found(BatchKind::Processing, batch_id))
    }

    pub fn get_processing_batch_with_members(
        &self,
        batch_id: BatchId,
    ) -> RepoResult<BatchWithMembers<ProcessingBatch>> {
        let batch = self.get_processing_batch(batch_id)?;
        let members = self.repo.processing_members(batch_id)?;
        Ok(BatchWithMembers { batch, members })
    }

    pub fn list_processing_batches(&self, open_only: bool) -> RepoResult<Vec<ProcessingBatch>> {
        self.repo.list_processing_batches(open_only)
    }

    pub fn processing_batch_for_goat(&self, goat_id: GoatId) -> RepoResult<Option<ProcessingBatch>> {
        self.repo.processing_batch_for_goat(goat_id)
    }
}

fn not_found(kind: BatchKind, batch_id: BatchId) -> RepoError {
    RepoError::NotFound {
        entity: Entity::from(kind),
        key: batch_id.to_string(),
    }
}

fn log_admission(kind: BatchKind, batch_id: BatchId, goat_id: GoatId, result: &RepoResult<Goat>) {
    match result {
        Ok(goat) => info!(
            "event=batch_add_goat module=service status=ok kind={kind} batch_id={batch_id} goat_id={goat_id} goat_status={}",
            goat.status
        ),
        Err(err) => warn!(
            "event=batch_add_goat module=service status=rejected kind={kind} batch_id={batch_id} goat_id={goat_id} error_class={:?}",
            err.class()
        ),
    }
}
