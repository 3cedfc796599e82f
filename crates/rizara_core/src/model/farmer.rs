//! Farmer onboarding record.
//!
//! # Invariants
//! - `phone` is stored in compact form (no separators) and is unique store-wide.
//! - Farmers are never deleted; goats reference them for their whole life.

use super::validation::{coordinate, normalize_phone, optional_text, required_text};
use super::{FarmerId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted farmer row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farmer {
    pub id: FarmerId,
    pub name: String,
    pub phone: String,
    pub county: String,
    pub ward: String,
    pub village: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Free-text directions, e.g. "behind the chief's camp".
    pub location_notes: Option<String>,
    pub onboarded_at: DateTime<Utc>,
}

/// Onboarding input. Build with [`NewFarmer::new`] and the optional setters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFarmer {
    pub name: String,
    pub phone: String,
    pub county: String,
    pub ward: String,
    pub village: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_notes: Option<String>,
}

impl NewFarmer {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        county: impl Into<String>,
        ward: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            county: county.into(),
            ward: ward.into(),
            ..Self::default()
        }
    }

    pub fn village(mut self, village: impl Into<String>) -> Self {
        self.village = Some(village.into());
        self
    }

    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn location_notes(mut self, notes: impl Into<String>) -> Self {
        self.location_notes = Some(notes.into());
        self
    }

    /// Returns a trimmed copy ready for persistence.
    ///
    /// # Errors
    /// - `BlankField` for an empty name, phone, county or ward.
    /// - `InvalidPhone` when the phone is not a plausible number.
    /// - `CoordinateOutOfRange` for latitude outside ±90 or longitude outside ±180.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name)?,
            phone: normalize_phone(&self.phone)?,
            county: required_text("county", &self.county)?,
            ward: required_text("ward", &self.ward)?,
            village: optional_text(self.village.as_deref()),
            latitude: coordinate("latitude", self.latitude, 90.0)?,
            longitude: coordinate("longitude", self.longitude, 180.0)?,
            location_notes: optional_text(self.location_notes.as_deref()),
        })
    }
}
