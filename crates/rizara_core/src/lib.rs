//! Livestock traceability record store.
//!
//! Farmers, their goats, the aggregation and processing batches goats move
//! through, and the one-per-goat traceability record issued after
//! processing. This crate owns every lifecycle and uniqueness rule.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::batch::{
    AggregationBatch, BatchKind, BatchState, BatchWithMembers, NewAggregationBatch,
    NewProcessingBatch, ProcessingBatch,
};
pub use model::farmer::{Farmer, NewFarmer};
pub use model::goat::{AggregationIntake, Goat, GoatStatus, NewGoat, WeightMethod};
pub use model::traceability::{GoatTrace, TracePayload, TraceabilityRecord};
pub use model::user::User;
pub use model::{BatchId, FarmerId, GoatId, UserId, ValidationError};
pub use repo::goat_repo::GoatStatusCounts;
pub use repo::{Entity, ErrorClass, RepoError, RepoResult};
pub use service::rizara_id::{FarmerSequenceIdGenerator, RizaraIdGenerator, RizaraIdRequest};
pub use store::RecordStore;

/// Minimal health-check API for host wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
