//! Aggregation and processing batches.
//!
//! # Responsibility
//! - Model the batch lock flag as an explicit `Open -> Locked` state machine.
//! - Define batch rows, creation inputs and the batch-with-members read model.
//!
//! # Invariants
//! - `Locked` is terminal and always carries its `locked_at` timestamp.
//! - Membership may only change while the batch is `Open`.

use super::goat::{Goat, GoatStatus};
use super::validation::{optional_text, required_text};
use super::{BatchId, UserId, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Which of the two batch families a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    Aggregation,
    Processing,
}

impl BatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aggregation => "aggregation",
            Self::Processing => "processing",
        }
    }

    /// Status a goat takes on when it joins a batch of this kind.
    pub fn member_status(self) -> GoatStatus {
        match self {
            Self::Aggregation => GoatStatus::Aggregated,
            Self::Processing => GoatStatus::Processed,
        }
    }

    pub(crate) fn batch_table(self) -> &'static str {
        match self {
            Self::Aggregation => "aggregation_batch",
            Self::Processing => "processing_batch",
        }
    }

    pub(crate) fn membership_table(self) -> &'static str {
        match self {
            Self::Aggregation => "aggregation_goats",
            Self::Processing => "processing_goats",
        }
    }

    pub(crate) fn membership_batch_column(self) -> &'static str {
        match self {
            Self::Aggregation => "aggregation_batch_id",
            Self::Processing => "processing_batch_id",
        }
    }
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock state of a batch. Persisted as `is_locked` + `locked_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchState {
    Open,
    Locked { locked_at: DateTime<Utc> },
}

impl BatchState {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Open => None,
            Self::Locked { locked_at } => Some(*locked_at),
        }
    }

    /// Performs the only transition. Returns `None` when already locked.
    pub fn lock(self, at: DateTime<Utc>) -> Option<Self> {
        match self {
            Self::Open => Some(Self::Locked { locked_at: at }),
            Self::Locked { .. } => None,
        }
    }

    /// Rebuilds the state from its column pair, rejecting inconsistent rows.
    pub(crate) fn from_columns(
        is_locked: bool,
        locked_at: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        match (is_locked, locked_at) {
            (false, None) => Ok(Self::Open),
            (true, Some(locked_at)) => Ok(Self::Locked { locked_at }),
            (true, None) => Err("is_locked=1 without locked_at".to_string()),
            (false, Some(_)) => Err("locked_at set on an open batch".to_string()),
        }
    }
}

/// Collection batch formed at an aggregation site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationBatch {
    pub id: BatchId,
    pub site_name: String,
    pub date_received: NaiveDate,
    pub state: BatchState,
    pub created_at: DateTime<Utc>,
    pub created_by_user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAggregationBatch {
    pub site_name: String,
    /// Defaults to the current UTC date.
    pub date_received: Option<NaiveDate>,
    pub created_by_user_id: Option<UserId>,
}

impl NewAggregationBatch {
    pub fn new(site_name: impl Into<String>, date_received: Option<NaiveDate>) -> Self {
        Self {
            site_name: site_name.into(),
            date_received,
            created_by_user_id: None,
        }
    }

    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by_user_id = Some(user_id);
        self
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            site_name: required_text("site_name", &self.site_name)?,
            date_received: self.date_received,
            created_by_user_id: self.created_by_user_id,
        })
    }
}

/// Slaughter batch at a processing facility under one halal certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingBatch {
    pub id: BatchId,
    pub facility: String,
    pub slaughter_date: Option<NaiveDate>,
    pub halal_cert_ref: Option<String>,
    pub state: BatchState,
    pub created_at: DateTime<Utc>,
    pub created_by_user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProcessingBatch {
    pub facility: String,
    pub slaughter_date: Option<NaiveDate>,
    pub halal_cert_ref: Option<String>,
    pub created_by_user_id: Option<UserId>,
}

impl NewProcessingBatch {
    pub fn new(
        facility: impl Into<String>,
        slaughter_date: Option<NaiveDate>,
        halal_cert_ref: Option<&str>,
    ) -> Self {
        Self {
            facility: facility.into(),
            slaughter_date,
            halal_cert_ref: halal_cert_ref.map(str::to_string),
            created_by_user_id: None,
        }
    }

    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by_user_id = Some(user_id);
        self
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            facility: required_text("facility", &self.facility)?,
            slaughter_date: self.slaughter_date,
            halal_cert_ref: optional_text(self.halal_cert_ref.as_deref()),
            created_by_user_id: self.created_by_user_id,
        })
    }
}

/// A batch together with its member goats, ordered by join time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchWithMembers<B> {
    pub batch: B,
    pub members: Vec<Goat>,
}

#[cfg(test)]
mod tests {
    use super::{BatchState, NewProcessingBatch};
    use chrono::{TimeZone, Utc};

    #[test]
    fn lock_is_terminal() {
        let at = Utc.with_ymd_and_hms(2026, 1, 10, 17, 0, 0).unwrap();
        let locked = BatchState::Open.lock(at).unwrap();
        assert_eq!(locked.locked_at(), Some(at));
        assert!(locked.is_locked());
        assert_eq!(locked.lock(at), None);
    }

    #[test]
    fn inconsistent_lock_columns_are_rejected() {
        assert!(BatchState::from_columns(true, None).is_err());
        assert!(BatchState::from_columns(false, Some(Utc::now())).is_err());
        assert_eq!(
            BatchState::from_columns(false, None).unwrap(),
            BatchState::Open
        );
    }

    #[test]
    fn processing_batch_requires_facility() {
        assert!(NewProcessingBatch::new("  ", None, None)
            .normalized()
            .is_err());
        let batch = NewProcessingBatch::new("FacB", None, Some(" "))
            .normalized()
            .unwrap();
        assert_eq!(batch.halal_cert_ref, None);
    }
}
