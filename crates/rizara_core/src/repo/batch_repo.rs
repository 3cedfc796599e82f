//! Aggregation/processing batch repository and SQLite implementation.
//!
//! # Responsibility
//! - Create, list and lock batches of both kinds.
//! - Admit goats into batches: the membership row, the goat status change
//!   and (for aggregation) the intake snapshot are written in one transaction.
//!
//! # Invariants
//! - Admission checks run in this order: batch exists, batch open, goat
//!   exists, goat not already in an open batch of the kind, status transition
//!   allowed. The first failing check decides the error. A goat whose status
//!   is already past the batch kind's stage fails the transition check
//!   regardless of its old membership.
//! - A locked batch is never unlocked and its membership never changes.
//! - `goat_id` is unique per membership table, so a goat holds at most one
//!   membership of each kind even under concurrent writers.

use super::goat_repo::{collect_goats, load_goat, parse_status, GOAT_COLUMNS};
use super::{
    begin_immediate, bool_to_int, constraint_violation, ensure_connection_ready, int_to_bool, now,
    ConstraintViolation, RepoError, RepoResult,
};
use crate::model::batch::{
    AggregationBatch, BatchKind, BatchState, NewAggregationBatch, NewProcessingBatch,
    ProcessingBatch,
};
use crate::model::goat::{AggregationIntake, Goat, GoatStatus};
use crate::model::{BatchId, GoatId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

const AGGREGATION_COLUMNS: &str = "b.id AS id,
    b.site_name AS site_name,
    b.date_received AS date_received,
    b.is_locked AS is_locked,
    b.locked_at AS locked_at,
    b.created_at AS created_at,
    b.created_by_user_id AS created_by_user_id";

const PROCESSING_COLUMNS: &str = "b.id AS id,
    b.facility AS facility,
    b.slaughter_date AS slaughter_date,
    b.halal_cert_ref AS halal_cert_ref,
    b.is_locked AS is_locked,
    b.locked_at AS locked_at,
    b.created_at AS created_at,
    b.created_by_user_id AS created_by_user_id";

/// Repository interface for batch lifecycle and membership.
pub trait BatchRepository {
    fn open_aggregation_batch(&self, batch: &NewAggregationBatch) -> RepoResult<AggregationBatch>;
    fn get_aggregation_batch(&self, id: BatchId) -> RepoResult<Option<AggregationBatch>>;
    /// Newest first; `open_only` hides locked batches.
    fn list_aggregation_batches(&self, open_only: bool) -> RepoResult<Vec<AggregationBatch>>;
    /// Moves an `on_farm` goat into the batch and records the intake snapshot.
    fn add_goat_to_aggregation(
        &self,
        batch_id: BatchId,
        goat_id: GoatId,
        intake: &AggregationIntake,
    ) -> RepoResult<Goat>;
    fn lock_aggregation_batch(&self, batch_id: BatchId) -> RepoResult<AggregationBatch>;
    /// Members in join order.
    fn aggregation_members(&self, batch_id: BatchId) -> RepoResult<Vec<Goat>>;
    fn aggregation_batch_for_goat(&self, goat_id: GoatId) -> RepoResult<Option<AggregationBatch>>;

    fn open_processing_batch(&self, batch: &NewProcessingBatch) -> RepoResult<ProcessingBatch>;
    fn get_processing_batch(&self, id: BatchId) -> RepoResult<Option<ProcessingBatch>>;
    fn list_processing_batches(&self, open_only: bool) -> RepoResult<Vec<ProcessingBatch>>;
    /// Moves an `aggregated` goat into the batch.
    fn add_goat_to_processing(&self, batch_id: BatchId, goat_id: GoatId) -> RepoResult<Goat>;
    fn lock_processing_batch(&self, batch_id: BatchId) -> RepoResult<ProcessingBatch>;
    fn processing_members(&self, batch_id: BatchId) -> RepoResult<Vec<Goat>>;
    fn processing_batch_for_goat(&self, goat_id: GoatId) -> RepoResult<Option<ProcessingBatch>>;
}

/// SQLite-backed batch repository.
pub struct SqliteBatchRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBatchRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl BatchRepository for SqliteBatchRepository<'_> {
    fn open_aggregation_batch(&self, batch: &NewAggregationBatch) -> RepoResult<AggregationBatch> {
        let batch = batch.normalized()?;
        let created_at = now();
        let date_received = batch
            .date_received
            .unwrap_or_else(|| created_at.date_naive());

        let tx = begin_immediate(self.conn)?;
        tx.execute(
            "INSERT INTO aggregation_batch (
                site_name,
                date_received,
                is_locked,
                locked_at,
                created_at,
                created_by_user_id
            ) VALUES (?1, ?2, 0, NULL, ?3, ?4);",
            params![
                batch.site_name,
                date_received,
                created_at,
                batch.created_by_user_id,
            ],
        )
        .map_err(|err| map_user_violation(err, "created_by_user_id"))?;
        let id = tx.last_insert_rowid();
        let created = load_aggregation_batch(&tx, id)?.ok_or_else(|| missing_after_insert(id))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_aggregation_batch(&self, id: BatchId) -> RepoResult<Option<AggregationBatch>> {
        load_aggregation_batch(self.conn, id)
    }

    fn list_aggregation_batches(&self, open_only: bool) -> RepoResult<Vec<AggregationBatch>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AGGREGATION_COLUMNS}
             FROM aggregation_batch b
             WHERE (?1 = 0 OR b.is_locked = 0)
             ORDER BY b.created_at DESC, b.id DESC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(open_only)])?;
        let mut batches = Vec::new();
        while let Some(row) = rows.next()? {
            batches.push(parse_aggregation_row(row)?);
        }
        Ok(batches)
    }

    fn add_goat_to_aggregation(
        &self,
        batch_id: BatchId,
        goat_id: GoatId,
        intake: &AggregationIntake,
    ) -> RepoResult<Goat> {
        let intake = intake.normalized()?;
        let tx = begin_immediate(self.conn)?;
        let from = admit_goat(&tx, BatchKind::Aggregation, batch_id, goat_id)?;

        let changed = tx.execute(
            "UPDATE goat
             SET status = ?2,
                 aggregated_at = ?3,
                 live_weight_kg = ?4,
                 weight_method = ?5,
                 purchase_price_per_head = ?6,
                 purchase_currency = ?7,
                 aggregated_by_user_id = ?8
             WHERE id = ?1
               AND status = ?9;",
            params![
                goat_id.to_string(),
                GoatStatus::Aggregated.as_str(),
                now(),
                intake.live_weight_kg,
                intake.weight_method.map(|method| method.as_str()),
                intake.purchase_price_per_head,
                intake.purchase_currency,
                intake.aggregated_by_user_id,
                from.as_str(),
            ],
        )
        .map_err(|err| map_user_violation(err, "aggregated_by_user_id"))?;
        ensure_single_row(changed, goat_id)?;

        let goat = load_goat(&tx, goat_id)?.ok_or(RepoError::UnknownGoat(goat_id))?;
        tx.commit()?;
        Ok(goat)
    }

    fn lock_aggregation_batch(&self, batch_id: BatchId) -> RepoResult<AggregationBatch> {
        let tx = begin_immediate(self.conn)?;
        lock_batch(&tx, BatchKind::Aggregation, batch_id)?;
        let locked = load_aggregation_batch(&tx, batch_id)?.ok_or(RepoError::UnknownBatch {
            kind: BatchKind::Aggregation,
            batch_id,
        })?;
        tx.commit()?;
        Ok(locked)
    }

    fn aggregation_members(&self, batch_id: BatchId) -> RepoResult<Vec<Goat>> {
        load_members(self.conn, BatchKind::Aggregation, batch_id)
    }

    fn aggregation_batch_for_goat(&self, goat_id: GoatId) -> RepoResult<Option<AggregationBatch>> {
        aggregation_batch_of_goat(self.conn, goat_id)
    }

    fn open_processing_batch(&self, batch: &NewProcessingBatch) -> RepoResult<ProcessingBatch> {
        let batch = batch.normalized()?;
        let tx = begin_immediate(self.conn)?;
        tx.execute(
            "INSERT INTO processing_batch (
                facility,
                slaughter_date,
                halal_cert_ref,
                is_locked,
                locked_at,
                created_at,
                created_by_user_id
            ) VALUES (?1, ?2, ?3, 0, NULL, ?4, ?5);",
            params![
                batch.facility,
                batch.slaughter_date,
                batch.halal_cert_ref,
                now(),
                batch.created_by_user_id,
            ],
        )
        .map_err(|err| map_user_violation(err, "created_by_user_id"))?;
        let id = tx.last_insert_rowid();
        let created = load_processing_batch(&tx, id)?.ok_or_else(|| missing_after_insert(id))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_processing_batch(&self, id: BatchId) -> RepoResult<Option<ProcessingBatch>> {
        load_processing_batch(self.conn, id)
    }

    fn list_processing_batches(&self, open_only: bool) -> RepoResult<Vec<ProcessingBatch>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROCESSING_COLUMNS}
             FROM processing_batch b
             WHERE (?1 = 0 OR b.is_locked = 0)
             ORDER BY b.created_at DESC, b.id DESC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(open_only)])?;
        let mut batches = Vec::new();
        while let Some(row) = rows.next()? {
            batches.push(parse_processing_row(row)?);
        }
        Ok(batches)
    }

    fn add_goat_to_processing(&self, batch_id: BatchId, goat_id: GoatId) -> RepoResult<Goat> {
        let tx = begin_immediate(self.conn)?;
        let from = admit_goat(&tx, BatchKind::Processing, batch_id, goat_id)?;

        let changed = tx.execute(
            "UPDATE goat
             SET status = ?2
             WHERE id = ?1
               AND status = ?3;",
            params![
                goat_id.to_string(),
                GoatStatus::Processed.as_str(),
                from.as_str(),
            ],
        )?;
        ensure_single_row(changed, goat_id)?;

        let goat = load_goat(&tx, goat_id)?.ok_or(RepoError::UnknownGoat(goat_id))?;
        tx.commit()?;
        Ok(goat)
    }

    fn lock_processing_batch(&self, batch_id: BatchId) -> RepoResult<ProcessingBatch> {
        let tx = begin_immediate(self.conn)?;
        lock_batch(&tx, BatchKind::Processing, batch_id)?;
        let locked = load_processing_batch(&tx, batch_id)?.ok_or(RepoError::UnknownBatch {
            kind: BatchKind::Processing,
            batch_id,
        })?;
        tx.commit()?;
        Ok(locked)
    }

    fn processing_members(&self, batch_id: BatchId) -> RepoResult<Vec<Goat>> {
        load_members(self.conn, BatchKind::Processing, batch_id)
    }

    fn processing_batch_for_goat(&self, goat_id: GoatId) -> RepoResult<Option<ProcessingBatch>> {
        processing_batch_of_goat(self.conn, goat_id)
    }
}

/// Runs the admission checks and inserts the membership row.
///
/// Returns the goat's status before admission; the caller performs the
/// status update inside the same transaction.
fn admit_goat(
    tx: &Transaction<'_>,
    kind: BatchKind,
    batch_id: BatchId,
    goat_id: GoatId,
) -> RepoResult<GoatStatus> {
    let state = load_batch_state(tx, kind, batch_id)?
        .ok_or(RepoError::UnknownBatch { kind, batch_id })?;
    if state.is_locked() {
        return Err(RepoError::BatchLocked { kind, batch_id });
    }

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
    let to = kind.member_status();
    let invalid_transition = RepoError::InvalidStatusTransition {
        goat_id,
        from: status,
        to,
    };

    // A goat past this stage is never a double assignment, whatever its
    // old membership looks like.
    if status > to {
        return Err(invalid_transition);
    }

    if status == to {
        if let Some((existing_batch, existing_state)) = membership_of(tx, kind, goat_id)? {
            if !existing_state.is_locked() {
                return Err(RepoError::GoatAlreadyInBatch {
                    goat_id,
                    kind,
                    batch_id: existing_batch,
                });
            }
        }
    }

    if !status.can_transition_to(to) {
        return Err(invalid_transition);
    }

    let sql = format!(
        "INSERT INTO {} ({}, goat_id, added_at) VALUES (?1, ?2, ?3);",
        kind.membership_table(),
        kind.membership_batch_column()
    );
    tx.execute(&sql, params![batch_id, goat_id.to_string(), now()])
        .map_err(|err| match constraint_violation(&err) {
            // Status allowed the move but a membership row already exists:
            // status and membership have drifted apart.
            Some(ConstraintViolation::Unique(_)) => RepoError::InvalidData(format!(
                "goat {goat_id} has {kind} membership but status `{status}`"
            )),
            _ => RepoError::from(err),
        })?;

    Ok(status)
}

fn lock_batch(tx: &Transaction<'_>, kind: BatchKind, batch_id: BatchId) -> RepoResult<()> {
    let state = load_batch_state(tx, kind, batch_id)?
        .ok_or(RepoError::UnknownBatch { kind, batch_id })?;
    let locked = state
        .lock(now())
        .ok_or(RepoError::AlreadyLocked { kind, batch_id })?;

    let sql = format!(
        "UPDATE {}
         SET is_locked = 1,
             locked_at = ?2
         WHERE id = ?1
           AND is_locked = 0;",
        kind.batch_table()
    );
    let changed = tx.execute(&sql, params![batch_id, locked.locked_at()])?;
    if changed != 1 {
        return Err(RepoError::AlreadyLocked { kind, batch_id });
    }
    Ok(())
}

fn load_batch_state(
    conn: &Connection,
    kind: BatchKind,
    batch_id: BatchId,
) -> RepoResult<Option<BatchState>> {
    let sql = format!(
        "SELECT is_locked, locked_at FROM {} WHERE id = ?1;",
        kind.batch_table()
    );
    let columns: Option<(i64, Option<DateTime<Utc>>)> = conn
        .query_row(&sql, [batch_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;
    columns
        .map(|(is_locked, locked_at)| -> RepoResult<BatchState> {
            batch_state(int_to_bool(is_locked, "batch.is_locked")?, locked_at, batch_id)
        })
        .transpose()
}

/// Existing membership of the goat in a batch of `kind`, with that batch's state.
fn membership_of(
    conn: &Connection,
    kind: BatchKind,
    goat_id: GoatId,
) -> RepoResult<Option<(BatchId, BatchState)>> {
    let sql = format!(
        "SELECT b.id, b.is_locked, b.locked_at
         FROM {membership} m
         INNER JOIN {batch} b ON b.id = m.{column}
         WHERE m.goat_id = ?1;",
        membership = kind.membership_table(),
        batch = kind.batch_table(),
        column = kind.membership_batch_column(),
    );
    let row: Option<(BatchId, i64, Option<DateTime<Utc>>)> = conn
        .query_row(&sql, [goat_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .optional()?;
    row.map(|(batch_id, is_locked, locked_at)| -> RepoResult<(BatchId, BatchState)> {
        let state = batch_state(
            int_to_bool(is_locked, "batch.is_locked")?,
            locked_at,
            batch_id,
        )?;
        Ok((batch_id, state))
    })
    .transpose()
}

fn load_members(conn: &Connection, kind: BatchKind, batch_id: BatchId) -> RepoResult<Vec<Goat>> {
    if load_batch_state(conn, kind, batch_id)?.is_none() {
        return Err(RepoError::UnknownBatch { kind, batch_id });
    }
    let sql = format!(
        "SELECT {GOAT_COLUMNS}
         FROM {membership} m
         INNER JOIN goat g ON g.id = m.goat_id
         WHERE m.{column} = ?1
         ORDER BY m.added_at ASC, g.rizara_id ASC;",
        membership = kind.membership_table(),
        column = kind.membership_batch_column(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query([batch_id])?;
    collect_goats(rows)
}

pub(crate) fn aggregation_batch_of_goat(
    conn: &Connection,
    goat_id: GoatId,
) -> RepoResult<Option<AggregationBatch>> {
    let batch = conn
        .query_row(
            &format!(
                "SELECT {AGGREGATION_COLUMNS}
                 FROM aggregation_batch b
                 INNER JOIN aggregation_goats m ON m.aggregation_batch_id = b.id
                 WHERE m.goat_id = ?1;"
            ),
            [goat_id.to_string()],
            |row| Ok(parse_aggregation_row(row)),
        )
        .optional()?;
    batch.transpose()
}

pub(crate) fn processing_batch_of_goat(
    conn: &Connection,
    goat_id: GoatId,
) -> RepoResult<Option<ProcessingBatch>> {
    let batch = conn
        .query_row(
            &format!(
                "SELECT {PROCESSING_COLUMNS}
                 FROM processing_batch b
                 INNER JOIN processing_goats m ON m.processing_batch_id = b.id
                 WHERE m.goat_id = ?1;"
            ),
            [goat_id.to_string()],
            |row| Ok(parse_processing_row(row)),
        )
        .optional()?;
    batch.transpose()
}

fn load_aggregation_batch(conn: &Connection, id: BatchId) -> RepoResult<Option<AggregationBatch>> {
    let batch = conn
        .query_row(
            &format!("SELECT {AGGREGATION_COLUMNS} FROM aggregation_batch b WHERE b.id = ?1;"),
            [id],
            |row| Ok(parse_aggregation_row(row)),
        )
        .optional()?;
    batch.transpose()
}

fn load_processing_batch(conn: &Connection, id: BatchId) -> RepoResult<Option<ProcessingBatch>> {
    let batch = conn
        .query_row(
            &format!("SELECT {PROCESSING_COLUMNS} FROM processing_batch b WHERE b.id = ?1;"),
            [id],
            |row| Ok(parse_processing_row(row)),
        )
        .optional()?;
    batch.transpose()
}

fn parse_aggregation_row(row: &Row<'_>) -> RepoResult<AggregationBatch> {
    let id: BatchId = row.get("id")?;
    let is_locked = int_to_bool(row.get("is_locked")?, "aggregation_batch.is_locked")?;
    Ok(AggregationBatch {
        id,
        site_name: row.get("site_name")?,
        date_received: row.get("date_received")?,
        state: batch_state(is_locked, row.get("locked_at")?, id)?,
        created_at: row.get("created_at")?,
        created_by_user_id: row.get("created_by_user_id")?,
    })
}

fn parse_processing_row(row: &Row<'_>) -> RepoResult<ProcessingBatch> {
    let id: BatchId = row.get("id")?;
    let is_locked = int_to_bool(row.get("is_locked")?, "processing_batch.is_locked")?;
    Ok(ProcessingBatch {
        id,
        facility: row.get("facility")?,
        slaughter_date: row.get("slaughter_date")?,
        halal_cert_ref: row.get("halal_cert_ref")?,
        state: batch_state(is_locked, row.get("locked_at")?, id)?,
        created_at: row.get("created_at")?,
        created_by_user_id: row.get("created_by_user_id")?,
    })
}

fn batch_state(
    is_locked: bool,
    locked_at: Option<DateTime<Utc>>,
    batch_id: BatchId,
) -> RepoResult<BatchState> {
    BatchState::from_columns(is_locked, locked_at)
        .map_err(|message| RepoError::InvalidData(format!("batch {batch_id}: {message}")))
}

fn ensure_single_row(changed: usize, goat_id: GoatId) -> RepoResult<()> {
    if changed != 1 {
        return Err(RepoError::InvalidData(format!(
            "goat {goat_id} status changed during admission"
        )));
    }
    Ok(())
}

fn map_user_violation(err: rusqlite::Error, column: &str) -> RepoError {
    match constraint_violation(&err) {
        Some(ConstraintViolation::ForeignKey) => {
            RepoError::ReferentialViolation(format!("{column} does not reference a user"))
        }
        _ => RepoError::from(err),
    }
}

fn missing_after_insert(id: BatchId) -> RepoError {
    RepoError::InvalidData(format!("batch {id} missing after insert"))
}
