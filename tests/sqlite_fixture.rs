//! File-backed SQLite driver: fixture loading, truncation cleanup, snapshot
//! restore and the db module's insert-tracking.

use serde_json::{json, Map, Value};

use rehearse::{
    db::{DbDriver as _, Sqlite},
    module::db::{factory, DESCRIPTOR},
    Module as _, SuiteConfig, TestMeta,
};

const FIXTURE: &str = "\
    CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT);\n\
    INSERT INTO users (id, name, email) VALUES (1, 'alice', NULL);\n\
    INSERT INTO users (id, name, email) VALUES (2, 'bob', 'bob@x.io');\n";

fn criteria(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn load_then_cleanup_then_snapshot_load_round_trips() {
    // P8: the second load comes from the cached snapshot and must produce
    // the same data state as the first.
    let dir = tempfile::tempdir().unwrap();
    let mut driver = Sqlite::connect(dir.path().join("fixture.db")).unwrap();

    driver.load(FIXTURE).unwrap();
    assert_eq!(driver.count("users", &Map::new()).unwrap(), 2);

    driver.cleanup().unwrap();
    let gone = driver.count("users", &Map::new());
    assert!(gone.is_err(), "the table is gone after truncation");

    driver.load(FIXTURE).unwrap();
    assert_eq!(driver.count("users", &Map::new()).unwrap(), 2);
    let names = driver
        .select_values("name", "users", &Map::new())
        .unwrap();
    assert_eq!(names, [json!("alice"), json!("bob")]);
}

#[test]
fn null_criteria_match_sql_null_cells() {
    let dir = tempfile::tempdir().unwrap();
    let mut driver = Sqlite::connect(dir.path().join("nulls.db")).unwrap();
    driver.load(FIXTURE).unwrap();

    let count = driver
        .count("users", &criteria(json!({"email": null})))
        .unwrap();

    assert_eq!(count, 1, "only alice has a NULL email");
}

#[test]
fn primary_key_introspection_reads_the_pragma() {
    let dir = tempfile::tempdir().unwrap();
    let mut driver = Sqlite::connect(dir.path().join("pk.db")).unwrap();
    driver.load(FIXTURE).unwrap();

    assert_eq!(driver.primary_key("users").unwrap(), ["id"]);
}

#[test]
fn in_memory_databases_are_rejected() {
    assert!(Sqlite::connect(":memory:").is_err());
}

#[test]
fn db_module_deletes_inserted_rows_in_its_after_hook() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("module.db");
    let dump_path = dir.path().join("dump.sql");
    std::fs::write(&dump_path, FIXTURE).unwrap();

    let mut config = Map::new();
    let _ = config.insert(
        "dsn".into(),
        json!(format!("sqlite:{}", db_path.display())),
    );
    let _ = config.insert("dump".into(), json!(dump_path));

    let mut module = factory(&config).unwrap();
    assert_eq!(module.descriptor().name, DESCRIPTOR.name);
    module.initialize().unwrap();
    module.before_suite(&SuiteConfig::default()).unwrap();

    let meta = TestMeta { name: "t".into(), feature: None };
    module.cleanup();
    module.before(&meta).unwrap();

    let _ = module
        .call(
            "have_in_database",
            &[json!("users"), json!({"id": 3, "name": "carol"})],
        )
        .unwrap();
    let _ = module
        .call("see_in_database", &[json!("users"), json!({"name": "carol"})])
        .unwrap();

    module.after(&meta).unwrap();

    // The inserted row is deleted back; seeded rows survive.
    let _ = module
        .call(
            "dont_see_in_database",
            &[json!("users"), json!({"name": "carol"})],
        )
        .unwrap();
    let records = module
        .call("grab_num_records", &[json!("users")])
        .unwrap();
    assert_eq!(records, json!(2));
}

#[test]
fn db_module_assertions_fail_with_readable_messages() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("assert.db");
    let dump_path = dir.path().join("dump.sql");
    std::fs::write(&dump_path, FIXTURE).unwrap();

    let mut config = Map::new();
    let _ = config.insert(
        "dsn".into(),
        json!(format!("sqlite:{}", db_path.display())),
    );
    let _ = config.insert("dump".into(), json!(dump_path));

    let mut module = factory(&config).unwrap();
    module.initialize().unwrap();
    module.before_suite(&SuiteConfig::default()).unwrap();

    let err = module
        .call("see_in_database", &[json!("users"), json!({"name": "nobody"})])
        .unwrap_err();

    assert!(err.to_string().contains("no records found"));
    assert!(err.to_string().contains("users"));
}
