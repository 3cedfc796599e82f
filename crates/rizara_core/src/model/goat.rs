//! Goat record and its forward-only status machine.
//!
//! # Responsibility
//! - Define the goat row, registration input and aggregation intake snapshot.
//! - Encode allowed status transitions: `on_farm -> aggregated -> processed`.
//!
//! # Invariants
//! - `status` only ever moves to [`GoatStatus::next`]; there are no
//!   back-transitions and goats are never deleted.
//! - `aggregated_at` is set exactly when status is past `on_farm`.

use super::validation::{non_negative, optional_text};
use super::{FarmerId, GoatId, UserId, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Currency recorded for purchase prices when the caller does not name one.
pub const DEFAULT_PURCHASE_CURRENCY: &str = "KES";

/// Position of a goat in the supply chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoatStatus {
    /// Registered, still with the farmer.
    OnFarm,
    /// Collected into an aggregation batch.
    Aggregated,
    /// Slaughtered as part of a processing batch.
    Processed,
}

impl GoatStatus {
    pub const ALL: [GoatStatus; 3] = [Self::OnFarm, Self::Aggregated, Self::Processed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnFarm => "on_farm",
            Self::Aggregated => "aggregated",
            Self::Processed => "processed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "on_farm" => Some(Self::OnFarm),
            "aggregated" => Some(Self::Aggregated),
            "processed" => Some(Self::Processed),
            _ => None,
        }
    }

    /// The single state this status may advance to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::OnFarm => Some(Self::Aggregated),
            Self::Aggregated => Some(Self::Processed),
            Self::Processed => None,
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == Some(to)
    }
}

impl std::fmt::Display for GoatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `live_weight_kg` was obtained at the purchase point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMethod {
    Scale,
    Estimated,
    Tape,
    Other,
}

impl WeightMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scale => "scale",
            Self::Estimated => "estimated",
            Self::Tape => "tape",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scale" => Some(Self::Scale),
            "estimated" => Some(Self::Estimated),
            "tape" => Some(Self::Tape),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Persisted goat row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goat {
    pub id: GoatId,
    /// Ear tag or label the farmer uses; defaults to the farmer's name.
    pub farmer_tag: String,
    /// Human-readable unique code, e.g. `RZ-GOAT-2026-7-003`.
    pub rizara_id: String,
    pub sex: Option<String>,
    pub breed: Option<String>,
    pub estimated_dob: Option<NaiveDate>,
    pub status: GoatStatus,
    pub farmer_id: FarmerId,
    pub created_at: DateTime<Utc>,
    /// Set when the goat joined an aggregation batch.
    pub aggregated_at: Option<DateTime<Utc>>,
    /// Purchase-point snapshot captured with the aggregation membership.
    pub intake: AggregationIntake,
}

/// Registration input for a goat. The id and rizara id are generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGoat {
    pub farmer_tag: Option<String>,
    pub sex: Option<String>,
    pub breed: Option<String>,
    pub estimated_dob: Option<NaiveDate>,
}

impl NewGoat {
    pub fn normalized(&self) -> Self {
        Self {
            farmer_tag: optional_text(self.farmer_tag.as_deref()),
            sex: optional_text(self.sex.as_deref()).map(|value| value.to_lowercase()),
            breed: optional_text(self.breed.as_deref()),
            estimated_dob: self.estimated_dob,
        }
    }
}

/// Weight and price observed when a goat is bought into an aggregation batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationIntake {
    pub live_weight_kg: Option<f64>,
    pub weight_method: Option<WeightMethod>,
    pub purchase_price_per_head: Option<f64>,
    pub purchase_currency: Option<String>,
    /// Operator who recorded the intake.
    pub aggregated_by_user_id: Option<UserId>,
}

impl AggregationIntake {
    pub fn aggregated_by(mut self, user_id: UserId) -> Self {
        self.aggregated_by_user_id = Some(user_id);
        self
    }

    /// Validates amounts and fills the default currency when a price is given.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let purchase_price_per_head =
            non_negative("purchase_price_per_head", self.purchase_price_per_head)?;
        let purchase_currency = optional_text(self.purchase_currency.as_deref())
            .map(|value| value.to_uppercase())
            .or_else(|| {
                purchase_price_per_head.map(|_| DEFAULT_PURCHASE_CURRENCY.to_string())
            });
        Ok(Self {
            live_weight_kg: non_negative("live_weight_kg", self.live_weight_kg)?,
            weight_method: self.weight_method,
            purchase_price_per_head,
            purchase_currency,
            aggregated_by_user_id: self.aggregated_by_user_id,
        })
    }
}
