//! Tests for Engine
//!
//! These tests verify:
//! - Database lifecycle (create/use/list/drop)
//! - Statement execution and outcomes
//! - Table handle caching with LRU eviction
//! - Dropping a table or database invalidates cached handles
//! - Concurrent statements on shared and separate tables

use std::sync::Arc;
use std::thread;

use leafdb::config::{Config, SyncStrategy};
use leafdb::engine::Engine;
use leafdb::index::Operator;
use leafdb::schema::{ColumnDef, ColumnType, Value};
use leafdb::statement::{Outcome, Statement};
use leafdb::table::Predicate;
use leafdb::LeafError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::OsBuffered)
        .tree_order(3)
        .cache_capacity(3)
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn id_name_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", ColumnType::Int).primary(),
        ColumnDef::new("name", ColumnType::Str),
    ]
}

/// Engine with database `db` holding table `t(id int primary, name string)`
fn setup_with_table() -> (TempDir, Engine) {
    let (dir, engine) = setup_temp_engine();
    engine.create_database("db").unwrap();
    engine.create_table("db", "t", &id_name_columns()).unwrap();
    (dir, engine)
}

fn row(id: i32, name: &str) -> Vec<Value> {
    vec![Value::Int(id), Value::from(name)]
}

fn select_all(engine: &Engine, database: &str, table: &str) -> Vec<Vec<String>> {
    engine.select(database, table, &[], &[]).unwrap().rows
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_open_creates_data_dir() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("nested").join("data");

    let _engine = Engine::open(Config::builder().data_dir(&data_dir).build()).unwrap();

    assert!(data_dir.is_dir());
}

#[test]
fn test_engine_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();

    let small_order = Config::builder()
        .data_dir(temp_dir.path())
        .tree_order(2)
        .build();
    let no_cache = Config::builder()
        .data_dir(temp_dir.path())
        .cache_capacity(0)
        .build();

    assert!(matches!(Engine::open(small_order), Err(LeafError::Config(_))));
    assert!(matches!(Engine::open(no_cache), Err(LeafError::Config(_))));
}

#[test]
fn test_open_path_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let engine = Engine::open_path(temp_dir.path()).unwrap();

    assert_eq!(engine.config().tree_order, 3);
    assert_eq!(engine.config().cache_capacity, 3);
}

// =============================================================================
// Database Tests
// =============================================================================

#[test]
fn test_create_and_list_databases() {
    let (_dir, engine) = setup_temp_engine();

    engine.create_database("zeta").unwrap();
    engine.create_database("alpha").unwrap();

    assert_eq!(engine.list_databases().unwrap(), vec!["alpha", "zeta"]);
}

#[test]
fn test_create_database_twice_fails() {
    let (_dir, engine) = setup_temp_engine();
    engine.create_database("db").unwrap();

    let result = engine.create_database("db");
    assert!(matches!(result, Err(LeafError::DatabaseExists(_))));
}

#[test]
fn test_invalid_names_rejected() {
    let (_dir, engine) = setup_temp_engine();

    for name in ["", "../escape", "a b", "x/y"] {
        assert!(matches!(
            engine.create_database(name),
            Err(LeafError::InvalidArgument(_))
        ));
    }
}

#[test]
fn test_use_database() {
    let (_dir, engine) = setup_temp_engine();
    engine.create_database("db").unwrap();

    assert!(matches!(
        engine.use_database("missing"),
        Err(LeafError::DatabaseNotFound(_))
    ));
    assert_eq!(engine.current_database(), None);

    engine.use_database("db").unwrap();
    assert_eq!(engine.current_database().as_deref(), Some("db"));
}

#[test]
fn test_drop_database_removes_tables() {
    let (dir, engine) = setup_with_table();
    engine.use_database("db").unwrap();
    engine.insert("db", "t", row(1, "a")).unwrap();

    engine.drop_database("db").unwrap();

    assert!(!dir.path().join("db").exists());
    assert!(engine.list_databases().unwrap().is_empty());
    assert_eq!(engine.current_database(), None);
    assert!(engine.cached_tables().is_empty());
    assert!(matches!(
        engine.drop_database("db"),
        Err(LeafError::DatabaseNotFound(_))
    ));
}

// =============================================================================
// Table Tests
// =============================================================================

#[test]
fn test_create_table_lists_and_caches() {
    let (_dir, engine) = setup_with_table();

    assert_eq!(engine.list_tables("db").unwrap(), vec!["t"]);
    assert_eq!(
        engine.cached_tables(),
        vec![("db".to_string(), "t".to_string())]
    );
}

#[test]
fn test_create_table_errors() {
    let (_dir, engine) = setup_with_table();

    assert!(matches!(
        engine.create_table("db", "t", &id_name_columns()),
        Err(LeafError::TableExists(_))
    ));
    assert!(matches!(
        engine.create_table("nodb", "t2", &id_name_columns()),
        Err(LeafError::DatabaseNotFound(_))
    ));

    let two_keys = vec![
        ColumnDef::new("a", ColumnType::Int).primary(),
        ColumnDef::new("b", ColumnType::Int).primary(),
    ];
    assert!(matches!(
        engine.create_table("db", "t3", &two_keys),
        Err(LeafError::InvalidSchema(_))
    ));
    assert_eq!(engine.list_tables("db").unwrap(), vec!["t"]);
}

#[test]
fn test_missing_table() {
    let (_dir, engine) = setup_with_table();

    let result = engine.select("db", "ghost", &[], &[]);
    assert!(matches!(result, Err(LeafError::TableNotFound(_))));
}

#[test]
fn test_drop_table_invalidates_handle() {
    let (_dir, engine) = setup_with_table();
    engine.insert("db", "t", row(1, "a")).unwrap();
    let stale = engine.table("db", "t").unwrap();

    engine.drop_table("db", "t").unwrap();

    assert!(engine.list_tables("db").unwrap().is_empty());
    assert!(stale.lock().is_dropped());
    assert!(matches!(
        stale.lock().read_rows(&[], &[]),
        Err(LeafError::TableDropped(_))
    ));
    assert!(matches!(
        engine.select("db", "t", &[], &[]),
        Err(LeafError::TableNotFound(_))
    ));
}

#[test]
fn test_drop_uncached_table() {
    let (dir, engine) = setup_with_table();
    drop(engine);

    let engine = Engine::open_path(dir.path()).unwrap();
    assert!(engine.cached_tables().is_empty());

    engine.drop_table("db", "t").unwrap();
    assert!(engine.list_tables("db").unwrap().is_empty());
}

#[test]
fn test_recreate_after_drop() {
    let (_dir, engine) = setup_with_table();
    engine.insert("db", "t", row(1, "old")).unwrap();
    engine.drop_table("db", "t").unwrap();

    engine.create_table("db", "t", &id_name_columns()).unwrap();

    assert!(select_all(&engine, "db", "t").is_empty());
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_cache_evicts_least_recently_used() {
    let (_dir, engine) = setup_temp_engine();
    engine.create_database("db").unwrap();
    for name in ["a", "b", "c"] {
        engine.create_table("db", name, &id_name_columns()).unwrap();
    }

    // Touch "a" so "b" becomes the least recently used
    engine.select("db", "a", &[], &[]).unwrap();
    engine.create_table("db", "d", &id_name_columns()).unwrap();

    let cached: Vec<String> = engine.cached_tables().into_iter().map(|(_, t)| t).collect();
    assert_eq!(cached, vec!["d", "a", "c"]);
}

#[test]
fn test_evicted_table_reopens_with_data() {
    let (_dir, engine) = setup_temp_engine();
    engine.create_database("db").unwrap();
    engine.create_table("db", "first", &id_name_columns()).unwrap();
    engine.insert("db", "first", row(1, "kept")).unwrap();

    for name in ["x", "y", "z"] {
        engine.create_table("db", name, &id_name_columns()).unwrap();
    }
    assert!(!engine
        .cached_tables()
        .contains(&("db".to_string(), "first".to_string())));

    assert_eq!(
        select_all(&engine, "db", "first"),
        vec![vec!["1".to_string(), "kept".to_string()]]
    );
}

#[test]
fn test_cache_returns_shared_handle() {
    let (_dir, engine) = setup_with_table();

    let a = engine.table("db", "t").unwrap();
    let b = engine.table("db", "t").unwrap();

    assert!(Arc::ptr_eq(&a, &b));
}

// =============================================================================
// Statement Execution Tests
// =============================================================================

#[test]
fn test_execute_statement_sequence() {
    let (_dir, engine) = setup_temp_engine();

    let statements = vec![
        Statement::CreateDatabase { name: "shop".into() },
        Statement::UseDatabase { name: "shop".into() },
        Statement::CreateTable {
            database: None,
            table: "items".into(),
            columns: id_name_columns(),
        },
    ];
    for statement in statements {
        assert_eq!(engine.execute(statement).unwrap(), Outcome::Done);
    }

    for (id, name) in [(2, "pen"), (1, "cup")] {
        let outcome = engine
            .execute(Statement::Insert {
                database: None,
                table: "items".into(),
                values: row(id, name),
            })
            .unwrap();
        assert_eq!(outcome.affected(), Some(1));
    }

    let outcome = engine
        .execute(Statement::Select {
            database: Some("shop".into()),
            table: "items".into(),
            columns: vec![],
            conditions: vec![],
        })
        .unwrap();
    let rows = outcome.rows().unwrap();
    assert_eq!(rows.columns, vec!["id", "name"]);
    assert_eq!(
        rows.rows,
        vec![
            vec!["1".to_string(), "cup".to_string()],
            vec!["2".to_string(), "pen".to_string()],
        ]
    );
}

#[test]
fn test_execute_update_and_delete_counts() {
    let (_dir, engine) = setup_with_table();
    for id in 1..=5 {
        engine.insert("db", "t", row(id, "v")).unwrap();
    }

    let updated = engine
        .execute(Statement::Update {
            database: Some("db".into()),
            table: "t".into(),
            column: "name".into(),
            value: Value::from("w"),
            conditions: vec![Predicate::new("id", Operator::Gt, 3)],
        })
        .unwrap();
    assert_eq!(updated, Outcome::Affected(2));

    let deleted = engine
        .execute(Statement::Delete {
            database: Some("db".into()),
            table: "t".into(),
            conditions: vec![Predicate::new("name", Operator::Eq, "v")],
        })
        .unwrap();
    assert_eq!(deleted, Outcome::Affected(3));

    assert_eq!(
        select_all(&engine, "db", "t"),
        vec![
            vec!["4".to_string(), "w".to_string()],
            vec!["5".to_string(), "w".to_string()],
        ]
    );
}

#[test]
fn test_table_statement_without_database() {
    let (_dir, engine) = setup_with_table();

    let result = engine.execute(Statement::DropTable {
        database: None,
        table: "t".into(),
    });

    assert!(matches!(result, Err(LeafError::InvalidArgument(_))));
}

#[test]
fn test_outcome_display() {
    assert_eq!(Outcome::Done.to_string(), "OK");
    assert_eq!(Outcome::Affected(3).to_string(), "OK, 3 row(s) affected");
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_inserts_same_table() {
    let (_dir, engine) = setup_with_table();
    let engine = Arc::new(engine);

    let mut handles = vec![];
    for t in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let id = t * 100 + i;
                engine_clone
                    .insert("db", "t", row(id, &format!("thread{}", t)))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let rows = select_all(&engine, "db", "t");
    assert_eq!(rows.len(), 100);

    let ids: Vec<i32> = rows.iter().map(|r| r[0].parse().unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn test_concurrent_statements_different_tables() {
    let (_dir, engine) = setup_temp_engine();
    engine.create_database("db").unwrap();
    for name in ["t0", "t1", "t2", "t3"] {
        engine.create_table("db", name, &id_name_columns()).unwrap();
    }
    let engine = Arc::new(engine);

    let mut handles = vec![];
    for t in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let table = format!("t{}", t);
            for i in 0..20 {
                engine_clone.insert("db", &table, row(i, "x")).unwrap();
            }
            engine_clone
                .delete("db", &table, &[Predicate::new("id", Operator::Lt, 10)])
                .unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
    for t in 0..4 {
        assert_eq!(select_all(&engine, "db", &format!("t{}", t)).len(), 10);
    }
}
