use rizara_core::db::migrations::latest_version;
use rizara_core::db::{open_db, open_db_in_memory, DbError};
use rizara_core::repo::farmer_repo::SqliteFarmerRepository;
use rizara_core::{NewFarmer, RecordStore, RepoError};
use rusqlite::Connection;

const STORE_TABLES: [&str; 8] = [
    "user",
    "farmer",
    "goat",
    "aggregation_batch",
    "aggregation_goats",
    "processing_batch",
    "processing_goats",
    "traceability_record",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in STORE_TABLES {
        assert_table_exists(&conn, table);
    }
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn reopening_database_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rizara.db");

    let farmer_id = {
        let conn = open_db(&path).unwrap();
        let store = RecordStore::try_new(&conn).unwrap();
        store
            .create_farmer(&NewFarmer::new("Asha", "0711000000", "Kitui", "X"))
            .unwrap()
            .id
    };

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let store = RecordStore::try_new(&conn).unwrap();
    assert_eq!(store.get_farmer(farmer_id).unwrap().name, "Asha");
}

#[test]
fn version_one_database_is_upgraded_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_init.sql"))
        .unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_column_exists(&conn, "goat", "live_weight_kg");
    assert_column_exists(&conn, "goat", "aggregated_at");
    assert_column_exists(&conn, "goat", "aggregated_by_user_id");
    assert_column_exists(&conn, "aggregation_batch", "created_by_user_id");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repositories_reject_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteFarmerRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
    assert!(RecordStore::try_new(&conn).is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

fn assert_column_exists(conn: &Connection, table: &str, column: &str) {
    let exists: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?1;"),
            [column],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "column {table}.{column} does not exist");
}
