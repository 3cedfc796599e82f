//! Traceability records and the public trace view.
//!
//! A record is issued once per processed goat and is immutable afterwards.
//! `qr_code_data` is opaque to the store; [`TracePayload`] is the shape the
//! store itself produces when asked to issue a record.

use super::batch::{AggregationBatch, ProcessingBatch};
use super::farmer::Farmer;
use super::goat::Goat;
use super::GoatId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceabilityRecord {
    pub id: i64,
    pub goat_id: GoatId,
    pub qr_code_data: String,
    pub public_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTraceabilityRecord {
    pub goat_id: GoatId,
    pub qr_code_data: String,
    pub public_url: String,
}

/// Everything the public lookup page shows for one goat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoatTrace {
    pub goat: Goat,
    pub farmer: Farmer,
    pub aggregation_batch: Option<AggregationBatch>,
    pub processing_batch: Option<ProcessingBatch>,
    pub record: Option<TraceabilityRecord>,
}

/// JSON document encoded into the QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePayload {
    pub goat_id: GoatId,
    pub rizara_id: String,
    pub farmer_name: String,
    pub county: String,
    pub ward: String,
    pub aggregation_site: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub facility: Option<String>,
    pub slaughter_date: Option<NaiveDate>,
    pub halal_cert_ref: Option<String>,
    pub public_url: String,
}

impl TracePayload {
    pub fn from_trace(trace: &GoatTrace, public_url: impl Into<String>) -> Self {
        let aggregation = trace.aggregation_batch.as_ref();
        let processing = trace.processing_batch.as_ref();
        Self {
            goat_id: trace.goat.id,
            rizara_id: trace.goat.rizara_id.clone(),
            farmer_name: trace.farmer.name.clone(),
            county: trace.farmer.county.clone(),
            ward: trace.farmer.ward.clone(),
            aggregation_site: aggregation.map(|batch| batch.site_name.clone()),
            date_received: aggregation.map(|batch| batch.date_received),
            facility: processing.map(|batch| batch.facility.clone()),
            slaughter_date: processing.and_then(|batch| batch.slaughter_date),
            halal_cert_ref: processing.and_then(|batch| batch.halal_cert_ref.clone()),
            public_url: public_url.into(),
        }
    }
}

/// Joins `base_url` and the goat id into the public lookup URL.
pub fn public_trace_url(base_url: &str, goat_id: GoatId) -> String {
    format!("{}/trace/{goat_id}", base_url.trim().trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::public_trace_url;
    use uuid::Uuid;

    #[test]
    fn public_url_ignores_trailing_slash() {
        let id = Uuid::nil();
        assert_eq!(
            public_trace_url("https://trace.example/", id),
            format!("https://trace.example/trace/{id}")
        );
        assert_eq!(
            public_trace_url("https://trace.example", id),
            format!("https://trace.example/trace/{id}")
        );
    }
}
