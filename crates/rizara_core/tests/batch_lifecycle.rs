use chrono::{NaiveDate, Utc};
use rizara_core::db::{open_db, open_db_in_memory};
use rizara_core::{
    AggregationIntake, BatchKind, BatchState, Entity, ErrorClass, Goat, GoatStatus,
    NewAggregationBatch, NewFarmer, NewGoat, NewProcessingBatch, RecordStore, RepoError,
    WeightMethod,
};
use rusqlite::Connection;
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn seed_goat(store: &RecordStore<'_>) -> Goat {
    let farmer = match store.list_farmers().unwrap().into_iter().next() {
        Some(farmer) => farmer,
        None => store
            .create_farmer(&NewFarmer::new("Asha", "0711000000", "Kitui", "X").village("Y"))
            .unwrap(),
    };
    store.create_goat(&NewGoat::default(), farmer.id).unwrap()
}

fn site(store: &RecordStore<'_>, name: &str) -> i64 {
    store
        .open_aggregation_batch(&NewAggregationBatch::new(name, date(2026, 1, 10)))
        .unwrap()
        .id
}

fn facility(store: &RecordStore<'_>) -> i64 {
    store
        .open_processing_batch(&NewProcessingBatch::new(
            "FacB",
            date(2026, 1, 11),
            Some("CERT-1"),
        ))
        .unwrap()
        .id
}

#[test]
fn open_aggregation_batch_defaults_date_to_today() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();

    let batch = store
        .open_aggregation_batch(&NewAggregationBatch::new(" SiteA ", None))
        .unwrap();
    assert_eq!(batch.site_name, "SiteA");
    assert_eq!(batch.date_received, Utc::now().date_naive());
    assert_eq!(batch.state, BatchState::Open);

    let err = store
        .open_aggregation_batch(&NewAggregationBatch::new("  ", None))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);
}

#[test]
fn batch_author_must_reference_a_user() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();

    let err = store
        .open_processing_batch(&NewProcessingBatch::new("FacB", None, None).created_by(42))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::ReferentialViolation);

    let user = store
        .create_user("ops@rizara.example", "hash", false)
        .unwrap();
    let batch = store
        .open_processing_batch(&NewProcessingBatch::new("FacB", None, None).created_by(user.id))
        .unwrap();
    assert_eq!(batch.created_by_user_id, Some(user.id));
}

#[test]
fn add_to_aggregation_moves_goat_and_records_intake() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let goat = seed_goat(&store);
    let batch_id = site(&store, "SiteA");

    let intake = AggregationIntake {
        live_weight_kg: Some(32.5),
        weight_method: Some(WeightMethod::Scale),
        purchase_price_per_head: Some(8500.0),
        purchase_currency: None,
        aggregated_by_user_id: None,
    };
    let moved = store
        .add_goat_to_aggregation(batch_id, goat.id, &intake)
        .unwrap();

    assert_eq!(moved.status, GoatStatus::Aggregated);
    assert!(moved.aggregated_at.is_some());
    assert_eq!(moved.intake.live_weight_kg, Some(32.5));
    assert_eq!(moved.intake.weight_method, Some(WeightMethod::Scale));
    assert_eq!(moved.intake.purchase_currency.as_deref(), Some("KES"));

    let view = store.get_aggregation_batch_with_members(batch_id).unwrap();
    assert_eq!(view.batch.id, batch_id);
    assert_eq!(view.members, vec![moved]);
}

#[test]
fn admission_errors_follow_documented_order() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let ghost = Uuid::new_v4();
    let intake = AggregationIntake::default();

    // Unknown batch wins over unknown goat.
    let err = store
        .add_goat_to_aggregation(999, ghost, &intake)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UnknownBatch {
            kind: BatchKind::Aggregation,
            batch_id: 999
        }
    ));

    // Locked batch wins over unknown goat.
    let locked = site(&store, "Closed");
    store.lock_aggregation_batch(locked).unwrap();
    let err = store
        .add_goat_to_aggregation(locked, ghost, &intake)
        .unwrap_err();
    assert!(matches!(err, RepoError::BatchLocked { .. }));
    assert_eq!(err.class(), ErrorClass::BatchLocked);

    // Open batch, unknown goat.
    let open = site(&store, "SiteA");
    let err = store
        .add_goat_to_aggregation(open, ghost, &intake)
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownGoat(id) if id == ghost));

    // Already a member of another open batch.
    let goat = seed_goat(&store);
    store
        .add_goat_to_aggregation(open, goat.id, &intake)
        .unwrap();
    let other = site(&store, "SiteB");
    let err = store
        .add_goat_to_aggregation(other, goat.id, &intake)
        .unwrap_err();
    match err {
        RepoError::GoatAlreadyInBatch {
            goat_id,
            kind,
            batch_id,
        } => {
            assert_eq!(goat_id, goat.id);
            assert_eq!(kind, BatchKind::Aggregation);
            assert_eq!(batch_id, open);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Wrong status for the batch kind.
    let fresh = seed_goat(&store);
    let processing = facility(&store);
    let err = store
        .add_goat_to_processing(processing, fresh.id)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidStatusTransition {
            from: GoatStatus::OnFarm,
            to: GoatStatus::Processed,
            ..
        }
    ));
}

#[test]
fn rejected_admission_leaves_no_trace() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let goat = seed_goat(&store);
    let processing = facility(&store);

    store
        .add_goat_to_processing(processing, goat.id)
        .unwrap_err();

    assert_eq!(store.get_goat(goat.id).unwrap().status, GoatStatus::OnFarm);
    assert!(store
        .get_processing_batch_with_members(processing)
        .unwrap()
        .members
        .is_empty());
}

#[test]
fn goat_from_locked_batch_cannot_rejoin_aggregation() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let goat = seed_goat(&store);
    let first = site(&store, "SiteA");
    store
        .add_goat_to_aggregation(first, goat.id, &AggregationIntake::default())
        .unwrap();
    store.lock_aggregation_batch(first).unwrap();

    let second = site(&store, "SiteB");
    let err = store
        .add_goat_to_aggregation(second, goat.id, &AggregationIntake::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidStatusTransition {
            from: GoatStatus::Aggregated,
            to: GoatStatus::Aggregated,
            ..
        }
    ));
}

fn processed_goat(store: &RecordStore<'_>, lock_aggregation: bool) -> Goat {
    let goat = seed_goat(store);
    let first = site(store, "SiteA");
    store
        .add_goat_to_aggregation(first, goat.id, &AggregationIntake::default())
        .unwrap();
    if lock_aggregation {
        store.lock_aggregation_batch(first).unwrap();
    }
    store
        .add_goat_to_processing(facility(store), goat.id)
        .unwrap()
}

#[test]
fn processed_goat_cannot_rejoin_aggregation() {
    for lock_aggregation in [true, false] {
        let conn = open_db_in_memory().unwrap();
        let store = RecordStore::try_new(&conn).unwrap();
        let goat = processed_goat(&store, lock_aggregation);
        assert_eq!(goat.status, GoatStatus::Processed);

        let second = site(&store, "SiteB");
        let err = store
            .add_goat_to_aggregation(second, goat.id, &AggregationIntake::default())
            .unwrap_err();
        assert!(
            matches!(
                err,
                RepoError::InvalidStatusTransition {
                    from: GoatStatus::Processed,
                    to: GoatStatus::Aggregated,
                    ..
                }
            ),
            "lock_aggregation={lock_aggregation}: {err:?}"
        );
        assert!(store
            .get_aggregation_batch_with_members(second)
            .unwrap()
            .members
            .is_empty());
    }
}

#[test]
fn processed_goat_in_open_processing_batch_is_already_assigned() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let goat = processed_goat(&store, false);
    let first = store.processing_batch_for_goat(goat.id).unwrap().unwrap().id;

    let err = store
        .add_goat_to_processing(facility(&store), goat.id)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::GoatAlreadyInBatch {
            kind: BatchKind::Processing,
            batch_id,
            ..
        } if batch_id == first
    ));
}

#[test]
fn intake_records_aggregating_user() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let goat = seed_goat(&store);
    let batch_id = site(&store, "SiteA");

    let err = store
        .add_goat_to_aggregation(
            batch_id,
            goat.id,
            &AggregationIntake::default().aggregated_by(77),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ReferentialViolation(ref message) if message.contains("aggregated_by_user_id")
    ));
    assert_eq!(store.get_goat(goat.id).unwrap().status, GoatStatus::OnFarm);

    let user = store
        .create_user("buyer@rizara.example", "hash", false)
        .unwrap();
    let moved = store
        .add_goat_to_aggregation(
            batch_id,
            goat.id,
            &AggregationIntake::default().aggregated_by(user.id),
        )
        .unwrap();
    assert_eq!(moved.intake.aggregated_by_user_id, Some(user.id));
    assert_eq!(
        store.aggregation_batch_for_goat(goat.id).unwrap().map(|batch| batch.id),
        Some(batch_id)
    );
}

#[test]
fn lock_is_terminal_and_relock_fails() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let batch_id = site(&store, "SiteA");

    let locked = store.lock_aggregation_batch(batch_id).unwrap();
    assert!(locked.state.is_locked());
    assert!(locked.state.locked_at().is_some());

    let err = store.lock_aggregation_batch(batch_id).unwrap_err();
    assert!(matches!(err, RepoError::AlreadyLocked { .. }));
    assert_eq!(err.class(), ErrorClass::AlreadyExists);

    let reread = store.get_aggregation_batch_with_members(batch_id).unwrap();
    assert_eq!(reread.batch.state, locked.state);

    let err = store.lock_processing_batch(31).unwrap_err();
    assert!(matches!(
        err,
        RepoError::UnknownBatch {
            kind: BatchKind::Processing,
            batch_id: 31
        }
    ));
}

#[test]
fn open_only_listing_hides_locked_batches() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let a = site(&store, "SiteA");
    let b = site(&store, "SiteB");
    store.lock_aggregation_batch(a).unwrap();

    let all: Vec<i64> = store
        .list_aggregation_batches(false)
        .unwrap()
        .iter()
        .map(|batch| batch.id)
        .collect();
    assert_eq!(all.len(), 2);
    assert!(all.contains(&a) && all.contains(&b));

    let open = store.list_aggregation_batches(true).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, b);
}

#[test]
fn processing_moves_aggregated_goat_to_processed() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let goat = seed_goat(&store);
    let aggregation = site(&store, "SiteA");
    store
        .add_goat_to_aggregation(aggregation, goat.id, &AggregationIntake::default())
        .unwrap();

    let processing = facility(&store);
    let processed = store.add_goat_to_processing(processing, goat.id).unwrap();
    assert_eq!(processed.status, GoatStatus::Processed);

    let view = store.get_processing_batch_with_members(processing).unwrap();
    assert_eq!(view.batch.halal_cert_ref.as_deref(), Some("CERT-1"));
    assert_eq!(view.members.len(), 1);
    assert_eq!(view.members[0].id, goat.id);

    let counts = store.count_goats_by_status().unwrap();
    assert_eq!(counts.processed, 1);
    assert_eq!(counts.aggregated, 0);
}

#[test]
fn unknown_batch_read_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();

    let err = store.get_processing_batch_with_members(5).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: Entity::ProcessingBatch,
            ..
        }
    ));
}

#[test]
fn membership_table_rejects_second_row_for_goat() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    let goat = seed_goat(&store);
    let first = site(&store, "SiteA");
    let second = site(&store, "SiteB");
    store
        .add_goat_to_aggregation(first, goat.id, &AggregationIntake::default())
        .unwrap();

    let raw = conn.execute(
        "INSERT INTO aggregation_goats (aggregation_batch_id, goat_id, added_at)
         VALUES (?1, ?2, '2026-01-10 00:00:00+00:00');",
        rusqlite::params![second, goat.id.to_string()],
    );
    assert!(raw.is_err());
}

#[test]
fn concurrent_adds_of_one_goat_admit_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");

    let (goat_id, batches) = {
        let conn = open_db(&path).unwrap();
        let store = RecordStore::try_new(&conn).unwrap();
        let goat = seed_goat(&store);
        (goat.id, [site(&store, "SiteA"), site(&store, "SiteB")])
    };

    let barrier = Arc::new(Barrier::new(batches.len()));
    let handles: Vec<_> = batches
        .into_iter()
        .map(|batch_id| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let store = RecordStore::try_new(&conn).unwrap();
                barrier.wait();
                store
                    .add_goat_to_aggregation(batch_id, goat_id, &AggregationIntake::default())
                    .map(|goat| goat.status)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let admitted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let rejected = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(RepoError::GoatAlreadyInBatch { .. })))
        .count();
    assert_eq!((admitted, rejected), (1, 1));

    let conn = Connection::open(&path).unwrap();
    let memberships: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM aggregation_goats WHERE goat_id = ?1;",
            [goat_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(memberships, 1);
}
