//! Traceability record issuance and public trace lookup.
//!
//! # Responsibility
//! - Store caller-built records for processed goats.
//! - Build the QR payload and public URL when the store issues a record itself.
//!
//! # Invariants
//! - One record per goat; a second issue fails with
//!   `DuplicateTraceabilityRecord` and leaves the first untouched.

use crate::model::traceability::{
    public_trace_url, GoatTrace, NewTraceabilityRecord, TracePayload, TraceabilityRecord,
};
use crate::model::GoatId;
use crate::repo::traceability_repo::TraceabilityRepository;
use crate::repo::{Entity, RepoError, RepoResult};
use log::info;

/// Use-case service wrapper for traceability records.
pub struct TraceabilityService<R: TraceabilityRepository> {
    repo: R,
}

impl<R: TraceabilityRepository> TraceabilityService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores a record with caller-provided QR data and URL.
    ///
    /// # Errors
    /// `UnknownGoat`, then `InvalidStatusTransition` unless the goat is
    /// `processed`, then `DuplicateTraceabilityRecord`.
    pub fn create_traceability_record(
        &self,
        goat_id: GoatId,
        qr_code_data: impl Into<String>,
        public_url: impl Into<String>,
    ) -> RepoResult<TraceabilityRecord> {
        let record = self.repo.create_record(&NewTraceabilityRecord {
            goat_id,
            qr_code_data: qr_code_data.into(),
            public_url: public_url.into(),
        })?;
        info!(
            "event=trace_record_create module=service status=ok goat_id={goat_id} record_id={}",
            record.id
        );
        Ok(record)
    }

    /// Builds the JSON QR payload and `<base_url>/trace/<goat_id>`, then
    /// stores the record.
    pub fn issue_traceability_record(
        &self,
        goat_id: GoatId,
        base_url: &str,
    ) -> RepoResult<TraceabilityRecord> {
        let trace = self
            .repo
            .load_goat_trace(goat_id)?
            .ok_or(RepoError::UnknownGoat(goat_id))?;
        let public_url = public_trace_url(base_url, goat_id);
        let payload = TracePayload::from_trace(&trace, public_url.clone());
        let qr_code_data = serde_json::to_string(&payload).map_err(|err| {
            RepoError::InvalidData(format!("trace payload for goat {goat_id}: {err}"))
        })?;
        self.create_traceability_record(goat_id, qr_code_data, public_url)
    }

    pub fn get_traceability_by_goat(&self, goat_id: GoatId) -> RepoResult<TraceabilityRecord> {
        self.repo
            .get_by_goat(goat_id)?
            .ok_or_else(|| RepoError::NotFound {
                entity: Entity::TraceabilityRecord,
                key: goat_id.to_string(),
            })
    }

    /// Public lookup view. Works at every pipeline stage.
    pub fn trace_goat(&self, goat_id: GoatId) -> RepoResult<GoatTrace> {
        self.repo
            .load_goat_trace(goat_id)?
            .ok_or_else(|| RepoError::NotFound {
                entity: Entity::Goat,
                key: goat_id.to_string(),
            })
    }
}
