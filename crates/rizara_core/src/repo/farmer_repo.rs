//! Farmer repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `farmer.phone` is unique; a clash surfaces as `DuplicatePhone`.
//! - Listing order is deterministic: `name ASC, id ASC`.

use super::{
    begin_immediate, constraint_violation, ensure_connection_ready, now, ConstraintViolation,
    RepoError, RepoResult,
};
use crate::model::farmer::{Farmer, NewFarmer};
use crate::model::FarmerId;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const FARMER_COLUMNS: &str = "f.id AS id,
    f.name AS name,
    f.phone AS phone,
    f.county AS county,
    f.ward AS ward,
    f.village AS village,
    f.latitude AS latitude,
    f.longitude AS longitude,
    f.location_notes AS location_notes,
    f.onboarded_at AS onboarded_at";

/// Repository interface for farmer onboarding and lookup.
pub trait FarmerRepository {
    fn create_farmer(&self, farmer: &NewFarmer) -> RepoResult<Farmer>;
    fn get_farmer(&self, id: FarmerId) -> RepoResult<Option<Farmer>>;
    fn list_farmers(&self) -> RepoResult<Vec<Farmer>>;
}

/// SQLite-backed farmer repository.
pub struct SqliteFarmerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFarmerRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl FarmerRepository for SqliteFarmerRepository<'_> {
    fn create_farmer(&self, farmer: &NewFarmer) -> RepoResult<Farmer> {
        let farmer = farmer.normalized()?;
        let tx = begin_immediate(self.conn)?;

        let taken: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM farmer WHERE phone = ?1);",
            [farmer.phone.as_str()],
            |row| row.get(0),
        )?;
        if taken == 1 {
            return Err(RepoError::DuplicatePhone(farmer.phone));
        }

        tx.execute(
            "INSERT INTO farmer (
                name,
                phone,
                county,
                ward,
                village,
                latitude,
                longitude,
                location_notes,
                onboarded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                farmer.name,
                farmer.phone,
                farmer.county,
                farmer.ward,
                farmer.village,
                farmer.latitude,
                farmer.longitude,
                farmer.location_notes,
                now(),
            ],
        )
        .map_err(|err| match constraint_violation(&err) {
            Some(ConstraintViolation::Unique(_)) => RepoError::DuplicatePhone(farmer.phone.clone()),
            _ => RepoError::from(err),
        })?;

        let id = tx.last_insert_rowid();
        let created = load_farmer(&tx, id)?
            .ok_or_else(|| RepoError::InvalidData(format!("farmer {id} missing after insert")))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_farmer(&self, id: FarmerId) -> RepoResult<Option<Farmer>> {
        load_farmer(self.conn, id)
    }

    fn list_farmers(&self) -> RepoResult<Vec<Farmer>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FARMER_COLUMNS}
             FROM farmer f
             ORDER BY f.name ASC, f.id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut farmers = Vec::new();
        while let Some(row) = rows.next()? {
            farmers.push(parse_farmer_row(row)?);
        }
        Ok(farmers)
    }
}

pub(crate) fn load_farmer(conn: &Connection, id: FarmerId) -> RepoResult<Option<Farmer>> {
    let farmer = conn
        .query_row(
            &format!("SELECT {FARMER_COLUMNS} FROM farmer f WHERE f.id = ?1;"),
            [id],
            |row| Ok(parse_farmer_row(row)),
        )
        .optional()?;
    farmer.transpose()
}

pub(crate) fn parse_farmer_row(row: &Row<'_>) -> RepoResult<Farmer> {
    Ok(Farmer {
        id: row.get("id")?,
        name: row.get("name")?,
        phone: row.get("phone")?,
        county: row.get("county")?,
        ward: row.get("ward")?,
        village: row.get("village")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        location_notes: row.get("location_notes")?,
        onboarded_at: row.get("onboarded_at")?,
    })
}
