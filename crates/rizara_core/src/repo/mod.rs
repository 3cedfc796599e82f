//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - One repository per entity family; SQL stays inside this module.
//! - Translate engine constraint failures into semantic [`RepoError`]s.
//!
//! # Invariants
//! - Every mutation runs in a `BEGIN IMMEDIATE` transaction, so the
//!   check-then-write sequence holds the database write lock throughout.
//! - Write paths normalize input through the model constructors first.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod batch_repo;
mod error;
pub mod farmer_repo;
pub mod goat_repo;
pub mod traceability_repo;
pub mod user_repo;

pub use error::{Entity, ErrorClass, RepoError, RepoResult};

use crate::db::migrations::{current_version, latest_version};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

const REQUIRED_TABLES: [&str; 8] = [
    "user",
    "farmer",
    "goat",
    "aggregation_batch",
    "aggregation_goats",
    "processing_batch",
    "processing_goats",
    "traceability_record",
];

/// Engine constraint failure decoded from a `rusqlite` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConstraintViolation {
    /// `table.column` named in the engine message.
    Unique(String),
    ForeignKey,
}

pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::InvalidData(format!(
                "required table `{table}` is missing"
            )));
        }
    }
    Ok(())
}

/// Starts a write transaction that takes the database write lock up front.
///
/// Takes `&Connection` so repositories can share one borrowed connection.
/// Dropping the transaction without `commit` rolls it back.
pub(crate) fn begin_immediate(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Immediate,
    )?)
}

pub(crate) fn constraint_violation(err: &rusqlite::Error) -> Option<ConstraintViolation> {
    let rusqlite::Error::SqliteFailure(failure, message) = err else {
        return None;
    };
    match failure.extended_code {
        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            let target = message
                .as_deref()
                .and_then(|text| text.split(": ").nth(1))
                .unwrap_or_default()
                .to_string();
            Some(ConstraintViolation::Unique(target))
        }
        rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(ConstraintViolation::ForeignKey),
        _ => None,
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
