//! Login account repository and SQLite implementation.
//!
//! Emails are stored lowercase, so lookups lowercase their input too.

use super::{
    begin_immediate, bool_to_int, constraint_violation, ensure_connection_ready, int_to_bool, now,
    ConstraintViolation, RepoError, RepoResult,
};
use crate::model::user::{NewUser, User};
use crate::model::UserId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, email, password_hash, is_admin, created_at";

pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let user = user.normalized()?;
        let tx = begin_immediate(self.conn)?;

        if load_user_by_email(&tx, &user.email)?.is_some() {
            return Err(RepoError::DuplicateEmail(user.email));
        }

        tx.execute(
            "INSERT INTO \"user\" (email, password_hash, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                user.email,
                user.password_hash,
                bool_to_int(user.is_admin),
                now(),
            ],
        )
        .map_err(|err| match constraint_violation(&err) {
            Some(ConstraintViolation::Unique(_)) => RepoError::DuplicateEmail(user.email.clone()),
            _ => RepoError::from(err),
        })?;

        let id = tx.last_insert_rowid();
        let created = load_user(&tx, id)?
            .ok_or_else(|| RepoError::InvalidData(format!("user {id} missing after insert")))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        load_user(self.conn, id)
    }

    fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        load_user_by_email(self.conn, &email.trim().to_lowercase())
    }
}

fn load_user(conn: &Connection, id: UserId) -> RepoResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM \"user\" WHERE id = ?1;"),
            [id],
            |row| Ok(parse_user_row(row)),
        )
        .optional()?;
    user.transpose()
}

fn load_user_by_email(conn: &Connection, email: &str) -> RepoResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM \"user\" WHERE email = ?1;"),
            [email],
            |row| Ok(parse_user_row(row)),
        )
        .optional()?;
    user.transpose()
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        is_admin: int_to_bool(row.get("is_admin")?, "user.is_admin")?,
        created_at: row.get("created_at")?,
    })
}
