//! Input normalization helpers shared by the entity constructors.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE_SEPARATORS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-().]+").expect("valid separator regex"));

/// Rejected caller input. Never produced for data read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is empty after trimming.
    BlankField(&'static str),
    /// Phone number is not 7-15 digits with an optional leading `+`.
    InvalidPhone(String),
    /// Email does not look like `local@domain.tld`.
    InvalidEmail(String),
    /// Latitude/longitude outside the valid range.
    CoordinateOutOfRange { field: &'static str, value: f64 },
    /// Weight or price is negative or not finite.
    InvalidAmount { field: &'static str, value: f64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::InvalidPhone(value) => write!(f, "invalid phone number `{value}`"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::CoordinateOutOfRange { field, value } => {
                write!(f, "`{field}` out of range: {value}")
            }
            Self::InvalidAmount { field, value } => {
                write!(f, "`{field}` must be a non-negative number, got {value}")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Trims optional text; blank values collapse to `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

/// Strips separators so `0711 000-000` and `0711000000` collide on the unique index.
pub(crate) fn normalize_phone(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField("phone"));
    }
    let compact = PHONE_SEPARATORS_RE.replace_all(trimmed, "");
    if !PHONE_RE.is_match(&compact) {
        return Err(ValidationError::InvalidPhone(trimmed.to_string()));
    }
    Ok(compact.into_owned())
}

pub(crate) fn normalize_email(value: &str) -> Result<String, ValidationError> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ValidationError::BlankField("email"));
    }
    if !EMAIL_RE.is_match(&normalized) {
        return Err(ValidationError::InvalidEmail(normalized));
    }
    Ok(normalized)
}

pub(crate) fn coordinate(
    field: &'static str,
    value: Option<f64>,
    limit: f64,
) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(value) if !value.is_finite() || value.abs() > limit => {
            Err(ValidationError::CoordinateOutOfRange { field, value })
        }
        other => Ok(other),
    }
}

pub(crate) fn non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(ValidationError::InvalidAmount { field, value })
        }
        other => Ok(other),
    }
}
