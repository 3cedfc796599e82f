//! Traceability record repository and the joined trace read model.
//!
//! # Invariants
//! - At most one record per goat (`traceability_record.goat_id` is unique).
//! - Records are only issued for goats that reached `processed`.
//! - Records are never updated after insert.

use super::batch_repo::{aggregation_batch_of_goat, processing_batch_of_goat};
use super::farmer_repo::load_farmer;
use super::goat_repo::{load_goat, parse_status};
use super::{
    begin_immediate, constraint_violation, ensure_connection_ready, now, parse_uuid,
    ConstraintViolation, RepoError, RepoResult,
};
use crate::model::goat::GoatStatus;
use crate::model::traceability::{GoatTrace, NewTraceabilityRecord, TraceabilityRecord};
use crate::model::validation::required_text;
use crate::model::GoatId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECORD_COLUMNS: &str = "r.id AS id,
    r.goat_id AS goat_id,
    r.qr_code_data AS qr_code_data,
    r.public_url AS public_url,
    r.created_at AS created_at";

/// Repository interface for traceability records.
pub trait TraceabilityRepository {
    fn create_record(&self, record: &NewTraceabilityRecord) -> RepoResult<TraceabilityRecord>;
    fn get_by_goat(&self, goat_id: GoatId) -> RepoResult<Option<TraceabilityRecord>>;
    /// Goat, owner, batches and record in one read. `None` for unknown goats.
    fn load_goat_trace(&self, goat_id: GoatId) -> RepoResult<Option<GoatTrace>>;
}

/// SQLite-backed traceability repository.
pub struct SqliteTraceabilityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTraceabilityRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TraceabilityRepository for SqliteTraceabilityRepository<'_> {
    fn create_record(&self, record: &NewTraceabilityRecord) -> RepoResult<TraceabilityRecord> {
        let goat_id = record.goat_id;
        let qr_code_data = required_text("qr_code_data", &record.qr_code_data)?;
        let public_url = required_text("public_url", &record.public_url)?;
        let tx = begin_immediate(self.conn)?;

        let status_text: Option<String> = tx
            .query_row(
                "SELECT status FROM goat WHERE id = ?1;",
                [goat_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(status_text) = status_text else {
            return Err(RepoError::UnknownGoat(goat_id));
        };
        let status = parse_status(&status_text)?;
        if status != GoatStatus::Processed {
            return Err(RepoError::InvalidStatusTransition {
                goat_id,
                from: status,
                to: GoatStatus::Processed,
            });
        }

        if load_record(&tx, goat_id)?.is_some() {
            return Err(RepoError::DuplicateTraceabilityRecord(goat_id));
        }

        tx.execute(
            "INSERT INTO traceability_record (
                goat_id,
                qr_code_data,
                public_url,
                created_at
            ) VALUES (?1, ?2, ?3, ?4);",
            params![goat_id.to_string(), qr_code_data, public_url, now()],
        )
        .map_err(|err| match constraint_violation(&err) {
            Some(ConstraintViolation::Unique(_)) => RepoError::DuplicateTraceabilityRecord(goat_id),
            Some(ConstraintViolation::ForeignKey) => RepoError::UnknownGoat(goat_id),
            None => RepoError::from(err),
        })?;

        let created = load_record(&tx, goat_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("record for goat {goat_id} missing after insert"))
        })?;
        tx.commit()?;
        Ok(created)
    }

    fn get_by_goat(&self, goat_id: GoatId) -> RepoResult<Option<TraceabilityRecord>> {
        load_record(self.conn, goat_id)
    }

    fn load_goat_trace(&self, goat_id: GoatId) -> RepoResult<Option<GoatTrace>> {
        let Some(goat) = load_goat(self.conn, goat_id)? else {
            return Ok(None);
        };
        let farmer = load_farmer(self.conn, goat.farmer_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "goat {goat_id} references missing farmer {}",
                goat.farmer_id
            ))
        })?;

        Ok(Some(GoatTrace {
            aggregation_batch: aggregation_batch_of_goat(self.conn, goat_id)?,
            processing_batch: processing_batch_of_goat(self.conn, goat_id)?,
            record: load_record(self.conn, goat_id)?,
            goat,
            farmer,
        }))
    }
}

fn load_record(conn: &Connection, goat_id: GoatId) -> RepoResult<Option<TraceabilityRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM traceability_record r WHERE r.goat_id = ?1;"),
            [goat_id.to_string()],
            |row| Ok(parse_record_row(row)),
        )
        .optional()?;
    record.transpose()
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<TraceabilityRecord> {
    let goat_id: String = row.get("goat_id")?;
    Ok(TraceabilityRecord {
        id: row.get("id")?,
        goat_id: parse_uuid(&goat_id, "traceability_record.goat_id")?,
        qr_code_data: row.get("qr_code_data")?,
        public_url: row.get("public_url")?,
        created_at: row.get("created_at")?,
    })
}
