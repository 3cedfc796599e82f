//! Domain model for the livestock traceability store.
//!
//! # Responsibility
//! - Define the entities persisted by the store and their input shapes.
//! - Own the two lifecycle state machines: goat status and batch lock state.
//! - Normalize and validate caller input before it reaches SQL.
//!
//! # Invariants
//! - Goat identity is a UUID that is never reused; farmers, batches, records
//!   and users use integer row ids.
//! - Lifecycle transitions only move forward.

pub mod batch;
pub mod farmer;
pub mod goat;
pub mod traceability;
pub mod user;
pub(crate) mod validation;

pub use validation::ValidationError;

/// Integer row id of a farmer.
pub type FarmerId = i64;
/// Integer row id of an aggregation or processing batch.
pub type BatchId = i64;
/// Integer row id of a login account.
pub type UserId = i64;
/// Stable global goat identity.
pub type GoatId = uuid::Uuid;
