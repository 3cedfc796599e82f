//! Full pipeline: onboarding to traceability record.

use chrono::NaiveDate;
use rizara_core::db::open_db_in_memory;
use rizara_core::{
    AggregationIntake, GoatStatus, NewAggregationBatch, NewFarmer, NewGoat, NewProcessingBatch,
    RecordStore, RepoError,
};

#[test]
fn goat_moves_from_farm_to_traceability_record() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();

    let farmer = store
        .create_farmer(&NewFarmer::new("Asha", "0711000000", "Kitui", "X").village("Y"))
        .unwrap();
    let goat = store.create_goat(&NewGoat::default(), farmer.id).unwrap();
    assert_eq!(goat.status, GoatStatus::OnFarm);

    let aggregation = store
        .open_aggregation_batch(&NewAggregationBatch::new(
            "SiteA",
            NaiveDate::from_ymd_opt(2026, 1, 10),
        ))
        .unwrap();
    let goat = store
        .add_goat_to_aggregation(aggregation.id, goat.id, &AggregationIntake::default())
        .unwrap();
    assert_eq!(goat.status, GoatStatus::Aggregated);

    store.lock_aggregation_batch(aggregation.id).unwrap();
    let late = store.create_goat(&NewGoat::default(), farmer.id).unwrap();
    let err = store
        .add_goat_to_aggregation(aggregation.id, late.id, &AggregationIntake::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::BatchLocked { .. }));

    let processing = store
        .open_processing_batch(&NewProcessingBatch::new(
            "FacB",
            NaiveDate::from_ymd_opt(2026, 1, 11),
            Some("CERT-1"),
        ))
        .unwrap();
    let goat = store
        .add_goat_to_processing(processing.id, goat.id)
        .unwrap();
    assert_eq!(goat.status, GoatStatus::Processed);

    let record = store
        .create_traceability_record(goat.id, "qr", "https://trace.example/g")
        .unwrap();
    assert_eq!(record.goat_id, goat.id);
    let err = store
        .create_traceability_record(goat.id, "qr", "https://trace.example/g")
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateTraceabilityRecord(_)));

    let trace = store.trace_goat(goat.id).unwrap();
    assert_eq!(trace.farmer.name, "Asha");
    assert_eq!(trace.farmer.village.as_deref(), Some("Y"));
    assert_eq!(
        trace.aggregation_batch.map(|batch| batch.site_name),
        Some("SiteA".to_string())
    );
    assert_eq!(
        trace.processing_batch.and_then(|batch| batch.halal_cert_ref),
        Some("CERT-1".to_string())
    );
    assert_eq!(trace.record, Some(record));
    assert_eq!(store.get_goat(late.id).unwrap().status, GoatStatus::OnFarm);
}
