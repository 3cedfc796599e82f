//! Goat repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Register goats under an existing farmer with a caller-chosen rizara id.
//! - Provide status/farmer listings and the pipeline counts.
//!
//! # Invariants
//! - Registration never touches status beyond the initial `on_farm`; status
//!   changes belong to the batch repository, which writes them together with
//!   the membership row.
//! - `goat.rizara_id` is unique; a clash surfaces as `DuplicateRizaraId` so
//!   the caller can retry with another candidate.

use super::{
    begin_immediate, constraint_violation, ensure_connection_ready, now, parse_uuid,
    ConstraintViolation, RepoError, RepoResult,
};
use crate::model::goat::{AggregationIntake, Goat, GoatStatus, NewGoat, WeightMethod};
use crate::model::{FarmerId, GoatId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

pub(crate) const GOAT_COLUMNS: &str = "g.id AS id,
    g.farmer_tag AS farmer_tag,
    g.rizara_id AS rizara_id,
    g.sex AS sex,
    g.breed AS breed,
    g.estimated_dob AS estimated_dob,
    g.status AS status,
    g.farmer_id AS farmer_id,
    g.created_at AS created_at,
    g.aggregated_at AS aggregated_at,
    g.live_weight_kg AS live_weight_kg,
    g.weight_method AS weight_method,
    g.purchase_price_per_head AS purchase_price_per_head,
    g.purchase_currency AS purchase_currency,
    g.aggregated_by_user_id AS aggregated_by_user_id";

/// Number of goats at each pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GoatStatusCounts {
    pub on_farm: u64,
    pub aggregated: u64,
    pub processed: u64,
}

impl GoatStatusCounts {
    pub fn get(&self, status: GoatStatus) -> u64 {
        match status {
            GoatStatus::OnFarm => self.on_farm,
            GoatStatus::Aggregated => self.aggregated,
            GoatStatus::Processed => self.processed,
        }
    }

    pub fn total(&self) -> u64 {
        self.on_farm + self.aggregated + self.processed
    }
}

/// Repository interface for goat registration and lookup.
pub trait GoatRepository {
    /// Inserts one `on_farm` goat with a fresh UUID.
    ///
    /// A blank `farmer_tag` falls back to the owning farmer's name.
    fn create_goat(&self, farmer_id: FarmerId, goat: &NewGoat, rizara_id: &str)
        -> RepoResult<Goat>;
    fn get_goat(&self, id: GoatId) -> RepoResult<Option<Goat>>;
    /// Newest first.
    fn list_goats_by_status(&self, status: GoatStatus) -> RepoResult<Vec<Goat>>;
    /// Registration order.
    fn list_goats_by_farmer(&self, farmer_id: FarmerId) -> RepoResult<Vec<Goat>>;
    fn count_goats_by_status(&self) -> RepoResult<GoatStatusCounts>;
    /// All rizara ids already issued to the farmer's goats.
    fn rizara_ids_for_farmer(&self, farmer_id: FarmerId) -> RepoResult<Vec<String>>;
}

/// SQLite-backed goat repository.
pub struct SqliteGoatRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGoatRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GoatRepository for SqliteGoatRepository<'_> {
    fn create_goat(
        &self,
        farmer_id: FarmerId,
        goat: &NewGoat,
        rizara_id: &str,
    ) -> RepoResult<Goat> {
        let goat = goat.normalized();
        let rizara_id = rizara_id.trim();
        let tx = begin_immediate(self.conn)?;

        let farmer_name: Option<String> = tx
            .query_row(
                "SELECT name FROM farmer WHERE id = ?1;",
                [farmer_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(farmer_name) = farmer_name else {
            return Err(RepoError::UnknownFarmer(farmer_id));
        };

        let taken: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM goat WHERE rizara_id = ?1);",
            [rizara_id],
            |row| row.get(0),
        )?;
        if taken == 1 {
            return Err(RepoError::DuplicateRizaraId(rizara_id.to_string()));
        }

        let id = Uuid::new_v4();
        let farmer_tag = goat.farmer_tag.unwrap_or(farmer_name);
        tx.execute(
            "INSERT INTO goat (
                id,
                farmer_tag,
                rizara_id,
                sex,
                breed,
                estimated_dob,
                status,
                farmer_id,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                id.to_string(),
                farmer_tag,
                rizara_id,
                goat.sex,
                goat.breed,
                goat.estimated_dob,
                GoatStatus::OnFarm.as_str(),
                farmer_id,
                now(),
            ],
        )
        .map_err(|err| match constraint_violation(&err) {
            Some(ConstraintViolation::Unique(target)) if target.ends_with("rizara_id") => {
                RepoError::DuplicateRizaraId(rizara_id.to_string())
            }
            Some(ConstraintViolation::ForeignKey) => RepoError::UnknownFarmer(farmer_id),
            _ => RepoError::from(err),
        })?;

        let created = load_goat(&tx, id)?
            .ok_or_else(|| RepoError::InvalidData(format!("goat {id} missing after insert")))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_goat(&self, id: GoatId) -> RepoResult<Option<Goat>> {
        load_goat(self.conn, id)
    }

    fn list_goats_by_status(&self, status: GoatStatus) -> RepoResult<Vec<Goat>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GOAT_COLUMNS}
             FROM goat g
             WHERE g.status = ?1
             ORDER BY g.created_at DESC, g.rizara_id ASC;"
        ))?;
        let rows = stmt.query([status.as_str()])?;
        collect_goats(rows)
    }

    fn list_goats_by_farmer(&self, farmer_id: FarmerId) -> RepoResult<Vec<Goat>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GOAT_COLUMNS}
             FROM goat g
             WHERE g.farmer_id = ?1
             ORDER BY g.created_at ASC, g.rizara_id ASC;"
        ))?;
        let rows = stmt.query([farmer_id])?;
        collect_goats(rows)
    }

    fn count_goats_by_status(&self) -> RepoResult<GoatStatusCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM goat GROUP BY status;")?;
        let mut rows = stmt.query([])?;
        let mut counts = GoatStatusCounts::default();
        while let Some(row) = rows.next()? {
            let status_text: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            let count = stage_count(count, &status_text)?;
            match parse_status(&status_text)? {
                GoatStatus::OnFarm => counts.on_farm = count,
                GoatStatus::Aggregated => counts.aggregated = count,
                GoatStatus::Processed => counts.processed = count,
            }
        }
        Ok(counts)
    }

    fn rizara_ids_for_farmer(&self, farmer_id: FarmerId) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rizara_id FROM goat WHERE farmer_id = ?1 ORDER BY rizara_id ASC;")?;
        let mut rows = stmt.query([farmer_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

pub(crate) fn load_goat(conn: &Connection, id: GoatId) -> RepoResult<Option<Goat>> {
    let goat = conn
        .query_row(
            &format!("SELECT {GOAT_COLUMNS} FROM goat g WHERE g.id = ?1;"),
            [id.to_string()],
            |row| Ok(parse_goat_row(row)),
        )
        .optional()?;
    goat.transpose()
}

pub(crate) fn collect_goats(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<Goat>> {
    let mut goats = Vec::new();
    while let Some(row) = rows.next()? {
        goats.push(parse_goat_row(row)?);
    }
    Ok(goats)
}

pub(crate) fn parse_goat_row(row: &Row<'_>) -> RepoResult<Goat> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "goat.id")?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text)?;

    let weight_method = match row.get::<_, Option<String>>("weight_method")? {
        Some(value) => Some(WeightMethod::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid weight method `{value}` in goat.weight_method"
            ))
        })?),
        None => None,
    };

    Ok(Goat {
        id,
        farmer_tag: row.get("farmer_tag")?,
        rizara_id: row.get("rizara_id")?,
        sex: row.get("sex")?,
        breed: row.get("breed")?,
        estimated_dob: row.get("estimated_dob")?,
        status,
        farmer_id: row.get("farmer_id")?,
        created_at: row.get("created_at")?,
        aggregated_at: row.get("aggregated_at")?,
        intake: AggregationIntake {
            live_weight_kg: row.get("live_weight_kg")?,
            weight_method,
            purchase_price_per_head: row.get("purchase_price_per_head")?,
            purchase_currency: row.get("purchase_currency")?,
            aggregated_by_user_id: row.get("aggregated_by_user_id")?,
        },
    })
}

fn stage_count(count: i64, status_text: &str) -> RepoResult<u64> {
    u64::try_from(count).map_err(|_| {
        RepoError::InvalidData(format!("invalid goat count {count} for status `{status_text}`"))
    })
}

pub(crate) fn parse_status(value: &str) -> RepoResult<GoatStatus> {
    GoatStatus::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid status `{value}` in goat.status")))
}
