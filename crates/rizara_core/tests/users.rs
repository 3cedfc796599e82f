use rizara_core::db::open_db_in_memory;
use rizara_core::{Entity, ErrorClass, RecordStore, RepoError};

#[test]
fn create_user_lowercases_email_and_hides_hash() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();

    let user = store
        .create_user("  Admin@Rizara.Example ", "scrypt$salt$digest", true)
        .unwrap();
    assert_eq!(user.email, "admin@rizara.example");
    assert!(user.is_admin);
    assert!(!format!("{user:?}").contains("digest"));

    let json = serde_json::to_string(&user).unwrap();
    assert!(!json.contains("password_hash"));

    assert_eq!(store.get_user(user.id).unwrap(), user);
    assert_eq!(
        store.get_user_by_email("ADMIN@rizara.example").unwrap(),
        user
    );
}

#[test]
fn duplicate_email_is_rejected_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();
    store
        .create_user("ops@rizara.example", "hash-1", false)
        .unwrap();

    let err = store
        .create_user("OPS@rizara.example", "hash-2", true)
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateEmail(ref email) if email == "ops@rizara.example"));
    assert_eq!(err.class(), ErrorClass::DuplicateKey);
}

#[test]
fn malformed_email_and_missing_user_are_reported() {
    let conn = open_db_in_memory().unwrap();
    let store = RecordStore::try_new(&conn).unwrap();

    let err = store.create_user("not-an-email", "hash", false).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);

    let err = store.get_user_by_email("nobody@rizara.example").unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: Entity::User,
            ..
        }
    ));
}
