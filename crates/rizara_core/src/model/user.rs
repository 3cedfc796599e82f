//! Login accounts. Independent of the livestock entities.
//!
//! The store only keeps `password_hash`; hashing and verification belong to
//! the authentication layer.

use super::validation::{normalize_email, required_text};
use super::{UserId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Lowercase, unique.
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("is_admin", &self.is_admin)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

impl Debug for NewUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

impl NewUser {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, is_admin: bool) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            is_admin,
        }
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            email: normalize_email(&self.email)?,
            password_hash: required_text("password_hash", &self.password_hash)?,
            is_admin: self.is_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::NewUser;

    #[test]
    fn debug_output_never_contains_hash() {
        let user = NewUser::new("a@b.co", "scrypt:32768:8:1$salt$digest", true);
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("digest"));
        assert!(rendered.contains("<redacted>"));
    }
}
