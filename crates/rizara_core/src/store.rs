//! Record store facade over one migrated SQLite connection.
//!
//! Wires the per-entity services together so hosts deal with a single
//! handle. Every method delegates to the matching service.

use crate::config::StoreConfig;
use crate::model::batch::{
    AggregationBatch, BatchWithMembers, NewAggregationBatch, NewProcessingBatch, ProcessingBatch,
};
use crate::model::farmer::{Farmer, NewFarmer};
use crate::model::goat::{AggregationIntake, Goat, GoatStatus, NewGoat};
use crate::model::traceability::{GoatTrace, TraceabilityRecord};
use crate::model::user::User;
use crate::model::{BatchId, FarmerId, GoatId, UserId};
use crate::repo::batch_repo::SqliteBatchRepository;
use crate::repo::farmer_repo::SqliteFarmerRepository;
use crate::repo::goat_repo::{GoatStatusCounts, SqliteGoatRepository};
use crate::repo::traceability_repo::SqliteTraceabilityRepository;
use crate::repo::user_repo::SqliteUserRepository;
use crate::repo::RepoResult;
use crate::service::batch_service::BatchService;
use crate::service::farmer_service::FarmerService;
use crate::service::goat_service::GoatService;
use crate::service::rizara_id::{FarmerSequenceIdGenerator, DEFAULT_MAX_ATTEMPTS};
use crate::service::traceability_service::TraceabilityService;
use crate::service::user_service::UserService;
use rusqlite::Connection;

pub struct RecordStore<'conn> {
    farmers: FarmerService<SqliteFarmerRepository<'conn>>,
    goats: GoatService<SqliteGoatRepository<'conn>>,
    batches: BatchService<SqliteBatchRepository<'conn>>,
    traceability: TraceabilityService<SqliteTraceabilityRepository<'conn>>,
    users: UserService<SqliteUserRepository<'conn>>,
    public_base_url: String,
}

impl<'conn> RecordStore<'conn> {
    /// Builds the store with default settings.
    ///
    /// Fails with `UninitializedConnection` when `conn` was not opened
    /// through [`crate::db::open_db`] or [`crate::db::open_db_in_memory`].
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_settings(
            conn,
            StoreConfig::default().public_base_url,
            DEFAULT_MAX_ATTEMPTS,
        )
    }

    pub fn with_config(conn: &'conn Connection, config: &StoreConfig) -> RepoResult<Self> {
        Self::with_settings(conn, config.public_base_url.clone(), config.id_max_attempts)
    }

    fn with_settings(
        conn: &'conn Connection,
        public_base_url: String,
        id_max_attempts: u32,
    ) -> RepoResult<Self> {
        Ok(Self {
            farmers: FarmerService::new(SqliteFarmerRepository::try_new(conn)?),
            goats: GoatService::with_generator(
                SqliteGoatRepository::try_new(conn)?,
                FarmerSequenceIdGenerator,
                id_max_attempts,
            ),
            batches: BatchService::new(SqliteBatchRepository::try_new(conn)?),
            traceability: TraceabilityService::new(SqliteTraceabilityRepository::try_new(conn)?),
            users: UserService::new(SqliteUserRepository::try_new(conn)?),
            public_base_url,
        })
    }

    pub fn create_farmer(&self, farmer: &NewFarmer) -> RepoResult<Farmer> {
        self.farmers.create_farmer(farmer)
    }

    pub fn get_farmer(&self, id: FarmerId) -> RepoResult<Farmer> {
        self.farmers.get_farmer(id)
    }

    pub fn list_farmers(&self) -> RepoResult<Vec<Farmer>> {
        self.farmers.list_farmers()
    }

    pub fn create_goat(&self, goat: &NewGoat, farmer_id: FarmerId) -> RepoResult<Goat> {
        self.goats.create_goat(farmer_id, goat)
    }

    pub fn get_goat(&self, id: GoatId) -> RepoResult<Goat> {
        self.goats.get_goat(id)
    }

    pub fn list_goats_by_status(&self, status: GoatStatus) -> RepoResult<Vec<Goat>> {
        self.goats.list_goats_by_status(status)
    }

    pub fn list_goats_by_farmer(&self, farmer_id: FarmerId) -> RepoResult<Vec<Goat>> {
        self.goats.list_goats_by_farmer(farmer_id)
    }

    pub fn count_goats_by_status(&self) -> RepoResult<GoatStatusCounts> {
        self.goats.count_goats_by_status()
    }

    pub fn open_aggregation_batch(
        &self,
        batch: &NewAggregationBatch,
    ) -> RepoResult<AggregationBatch> {
        self.batches.open_aggregation_batch(batch)
    }

    pub fn add_goat_to_aggregation(
        &self,
        batch_id: BatchId,
        goat_id: GoatId,
        intake: &AggregationIntake,
    ) -> RepoResult<Goat> {
        self.batches
            .add_goat_to_aggregation(batch_id, goat_id, intake)
    }

    pub fn lock_aggregation_batch(&self, batch_id: BatchId) -> RepoResult<AggregationBatch> {
        self.batches.lock_aggregation_batch(batch_id)
    }

    pub fn get_aggregation_batch_with_members(
        &self,
        batch_id: BatchId,
    ) -> RepoResult<BatchWithMembers<AggregationBatch>> {
        self.batches.get_aggregation_batch_with_members(batch_id)
    }

    pub fn list_aggregation_batches(&self, open_only: bool) -> RepoResult<Vec<AggregationBatch>> {
        self.batches.list_aggregation_batches(open_only)
    }

    /// Aggregation batch the goat joined, if any.
    pub fn aggregation_batch_for_goat(
        &self,
        goat_id: GoatId,
    ) -> RepoResult<Option<AggregationBatch>> {
        self.batches.aggregation_batch_for_goat(goat_id)
    }

    pub fn open_processing_batch(&self, batch: &NewProcessingBatch) -> RepoResult<ProcessingBatch> {
        self.batches.open_processing_batch(batch)
    }

    pub fn add_goat_to_processing(&self, batch_id: BatchId, goat_id: GoatId) -> RepoResult<Goat> {
        self.batches.add_goat_to_processing(batch_id, goat_id)
    }

    pub fn lock_processing_batch(&self, batch_id: BatchId) -> RepoResult<ProcessingBatch> {
        self.batches.lock_processing_batch(batch_id)
    }

    pub fn get_processing_batch_with_members(
        &self,
        batch_id: BatchId,
    ) -> RepoResult<BatchWithMembers<ProcessingBatch>> {
        self.batches.get_processing_batch_with_members(batch_id)
    }

    pub fn list_processing_batches(&self, open_only: bool) -> RepoResult<Vec<ProcessingBatch>> {
        self.batches.list_processing_batches(open_only)
    }

    pub fn processing_batch_for_goat(&self, goat_id: GoatId) -> RepoResult<Option<ProcessingBatch>> {
        self.batches.processing_batch_for_goat(goat_id)
    }

    pub fn create_traceability_record(
        &self,
        goat_id: GoatId,
        qr_code_data: impl Into<String>,
        public_url: impl Into<String>,
    ) -> RepoResult<TraceabilityRecord> {
        self.traceability
            .create_traceability_record(goat_id, qr_code_data, public_url)
    }

    /// Issues a record under the configured public base URL.
    pub fn issue_traceability_record(&self, goat_id: GoatId) -> RepoResult<TraceabilityRecord> {
        self.traceability
            .issue_traceability_record(goat_id, &self.public_base_url)
    }

    pub fn get_traceability_by_goat(&self, goat_id: GoatId) -> RepoResult<TraceabilityRecord> {
        self.traceability.get_traceability_by_goat(goat_id)
    }

    pub fn trace_goat(&self, goat_id: GoatId) -> RepoResult<GoatTrace> {
        self.traceability.trace_goat(goat_id)
    }

    pub fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> RepoResult<User> {
        self.users.create_user(email, password_hash, is_admin)
    }

    pub fn get_user(&self, id: UserId) -> RepoResult<User> {
        self.users.get_user(id)
    }

    pub fn get_user_by_email(&self, email: &str) -> RepoResult<User> {
        self.users.get_user_by_email(email)
    }
}
