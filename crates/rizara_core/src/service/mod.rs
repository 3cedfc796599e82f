//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the record store operations.
//! - Turn absent reads into `NotFound` and emit metadata-only log events.

pub mod batch_service;
pub mod farmer_service;
pub mod goat_service;
pub mod rizara_id;
pub mod traceability_service;
pub mod user_service;
