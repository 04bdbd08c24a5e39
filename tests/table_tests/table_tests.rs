//! Tests for Table
//!
//! These tests verify:
//! - Table creation writes `.prof`, `.dat` and `.ind`
//! - Inserts coerce values and overwrite rows with the same key
//! - Selects route primary-key predicates through the index
//! - Updates and deletes affect exactly the matching rows
//! - Reopened tables load their index lazily
//! - Dropped tables remove their files and reject every operation

use leafdb::index::Operator;
use leafdb::schema::{ColumnDef, ColumnType, Schema, Value};
use leafdb::table::{Predicate, Table, TableOptions};
use leafdb::LeafError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn options() -> TableOptions {
    TableOptions {
        tree_order: 3,
        sync: false,
    }
}

/// t(id int primary, name string)
fn setup_table() -> (TempDir, Table) {
    let dir = TempDir::new().unwrap();
    let schema = Schema::from_defs(&[
        ColumnDef::new("id", ColumnType::Int).primary(),
        ColumnDef::new("name", ColumnType::Str),
    ])
    .unwrap();
    let table = Table::create(dir.path(), "t", schema, options()).unwrap();
    (dir, table)
}

fn insert(table: &mut Table, id: i32, name: &str) {
    table
        .insert_row(vec![Value::Int(id), Value::from(name)])
        .unwrap();
}

fn all_rows(table: &mut Table) -> Vec<Vec<String>> {
    table.read_rows(&[], &[]).unwrap().rows
}

fn strings(rows: &[(&str, &str)]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|(a, b)| vec![a.to_string(), b.to_string()])
        .collect()
}

// =============================================================================
// Create / Open Tests
// =============================================================================

#[test]
fn test_create_writes_three_files() {
    let (_dir, table) = setup_table();

    for path in table.files().all() {
        assert!(path.exists(), "{} missing", path.display());
    }
    assert!(table.is_index_open());
}

#[test]
fn test_create_existing_table_fails() {
    let (dir, table) = setup_table();
    let schema = table.schema().clone();

    let result = Table::create(dir.path(), "t", schema, options());
    assert!(matches!(result, Err(LeafError::TableExists(_))));
}

#[test]
fn test_create_over_leftover_files_keeps_them() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::from_defs(&[ColumnDef::new("id", ColumnType::Int)]).unwrap();

    for leftover in ["t.dat", "t.ind"] {
        let path = dir.path().join(leftover);
        std::fs::write(&path, b"keep me").unwrap();

        let result = Table::create(dir.path(), "t", schema.clone(), options());
        assert!(matches!(result, Err(LeafError::TableExists(_))), "{}", leftover);

        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
        assert!(!dir.path().join("t.prof").exists());
        std::fs::remove_file(&path).unwrap();
    }

    // Nothing left behind: a clean create still works
    assert!(Table::create(dir.path(), "t", schema, options()).is_ok());
}

#[test]
fn test_open_missing_table_fails() {
    let dir = TempDir::new().unwrap();

    let result = Table::open(dir.path(), "ghost", options());
    assert!(matches!(result, Err(LeafError::TableNotFound(_))));
}

#[test]
fn test_open_loads_index_lazily() {
    let (dir, mut table) = setup_table();
    insert(&mut table, 1, "a");
    drop(table);

    let mut table = Table::open(dir.path(), "t", options()).unwrap();
    assert!(!table.is_index_open());
    assert_eq!(table.schema().primary_column().name, "id");

    assert_eq!(all_rows(&mut table), strings(&[("1", "a")]));
    assert!(table.is_index_open());
}

// =============================================================================
// Insert Tests
// =============================================================================

#[test]
fn test_insert_and_select_all_ascending() {
    let (_dir, mut table) = setup_table();

    for (id, name) in [(3, "c"), (1, "a"), (2, "b")] {
        insert(&mut table, id, name);
    }

    assert_eq!(
        all_rows(&mut table),
        strings(&[("1", "a"), ("2", "b"), ("3", "c")])
    );
    assert_eq!(table.row_count().unwrap(), 3);
}

#[test]
fn test_insert_same_key_overwrites() {
    let (_dir, mut table) = setup_table();

    insert(&mut table, 1, "first");
    let slots = table.slot_count().unwrap();
    insert(&mut table, 1, "again");

    assert_eq!(all_rows(&mut table), strings(&[("1", "again")]));
    assert_eq!(table.slot_count().unwrap(), slots);
}

#[test]
fn test_insert_coerces_literals() {
    let (_dir, mut table) = setup_table();

    table
        .insert_row(vec![Value::from("7"), Value::Int(42)])
        .unwrap();

    assert_eq!(all_rows(&mut table), strings(&[("7", "42")]));
}

#[test]
fn test_insert_schema_mismatch_leaves_table_untouched() {
    let (_dir, mut table) = setup_table();
    insert(&mut table, 1, "a");
    let slots = table.slot_count().unwrap();

    let wrong_count = table.insert_row(vec![Value::Int(2)]);
    let wrong_type = table.insert_row(vec![Value::from("two"), Value::from("b")]);

    assert!(matches!(wrong_count, Err(LeafError::SchemaMismatch(_))));
    assert!(matches!(wrong_type, Err(LeafError::SchemaMismatch(_))));
    assert_eq!(table.slot_count().unwrap(), slots);
    assert_eq!(all_rows(&mut table), strings(&[("1", "a")]));
}

#[test]
fn test_string_primary_key() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::from_defs(&[
        ColumnDef::new("age", ColumnType::Int),
        ColumnDef::new("name", ColumnType::Str).primary(),
    ])
    .unwrap();
    let mut table = Table::create(dir.path(), "people", schema, options()).unwrap();

    for (age, name) in [(30, "carol"), (25, "alice"), (41, "bob")] {
        table
            .insert_row(vec![Value::Int(age), Value::from(name)])
            .unwrap();
    }

    // Leaf chain order is the key order
    let rows = all_rows(&mut table);
    let names: Vec<&str> = rows.iter().map(|r| r[1].as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);

    let hits = table
        .read_rows(&[], &[Predicate::new("name", Operator::Ge, "bob")])
        .unwrap();
    assert_eq!(hits.len(), 2);
}

// =============================================================================
// Select Tests
// =============================================================================

#[test]
fn test_select_by_key_operators() {
    let (_dir, mut table) = setup_table();
    for id in 1..=8 {
        insert(&mut table, id, &format!("n{}", id));
    }

    let ids = |table: &mut Table, op: Operator, key: i32| -> Vec<String> {
        table
            .read_rows(&["id".to_string()], &[Predicate::new("id", op, key)])
            .unwrap()
            .rows
            .into_iter()
            .map(|r| r[0].clone())
            .collect()
    };

    assert_eq!(ids(&mut table, Operator::Eq, 4), vec!["4"]);
    assert_eq!(ids(&mut table, Operator::Gt, 6), vec!["7", "8"]);
    assert_eq!(ids(&mut table, Operator::Ge, 6), vec!["6", "7", "8"]);
    assert_eq!(ids(&mut table, Operator::Lt, 3), vec!["1", "2"]);
    assert_eq!(ids(&mut table, Operator::Le, 3), vec!["1", "2", "3"]);
    assert!(ids(&mut table, Operator::Eq, 99).is_empty());
}

#[test]
fn test_select_combines_predicates() {
    let (_dir, mut table) = setup_table();
    for (id, name) in [(1, "x"), (2, "y"), (3, "x"), (4, "x"), (5, "y")] {
        insert(&mut table, id, name);
    }

    let result = table
        .read_rows(
            &[],
            &[
                Predicate::new("name", Operator::Eq, "x"),
                Predicate::new("id", Operator::Ge, 2),
            ],
        )
        .unwrap();

    assert_eq!(result.rows, strings(&[("3", "x"), ("4", "x")]));
}

#[test]
fn test_select_filters_non_key_ints_as_text() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::from_defs(&[
        ColumnDef::new("id", ColumnType::Int).primary(),
        ColumnDef::new("age", ColumnType::Int),
    ])
    .unwrap();
    let mut table = Table::create(dir.path(), "people", schema, options()).unwrap();
    for (id, age) in [(1, 9), (2, 10)] {
        table.insert_row(vec![Value::Int(id), Value::Int(age)]).unwrap();
    }

    let select = |table: &mut Table, predicates: &[Predicate]| {
        table.read_rows(&[], predicates).unwrap().rows
    };

    // "10" sorts before "9"
    assert!(select(&mut table, &[Predicate::new("age", Operator::Gt, 9)]).is_empty());
    assert_eq!(
        select(&mut table, &[Predicate::new("age", Operator::Lt, 9)]),
        strings(&[("2", "10")])
    );

    // The key predicate still follows the index order
    assert_eq!(
        select(&mut table, &[Predicate::new("id", Operator::Gt, 1)]),
        strings(&[("2", "10")])
    );
}

#[test]
fn test_string_column_keeps_literal_spelling() {
    let (_dir, mut table) = setup_table();

    for (id, literal) in [(1, "007"), (2, "-0"), (3, "0010")] {
        table
            .insert_row(vec![Value::Int(id), Value::parse_literal(literal)])
            .unwrap();
    }
    assert_eq!(
        all_rows(&mut table),
        strings(&[("1", "007"), ("2", "-0"), ("3", "0010")])
    );

    let predicate: Predicate = "name=007".parse().unwrap();
    let hit = table.read_rows(&[], &[predicate]).unwrap();
    assert_eq!(hit.rows, strings(&[("1", "007")]));
}

#[test]
fn test_select_projection() {
    let (_dir, mut table) = setup_table();
    insert(&mut table, 1, "a");

    let result = table.read_rows(&["name".to_string()], &[]).unwrap();
    assert_eq!(result.columns, vec!["name"]);
    assert_eq!(result.rows, vec![vec!["a".to_string()]]);

    let star = table.read_rows(&["*".to_string()], &[]).unwrap();
    assert_eq!(star.columns, vec!["id", "name"]);
}

#[test]
fn test_select_unknown_column() {
    let (_dir, mut table) = setup_table();

    let projection = table.read_rows(&["nope".to_string()], &[]);
    let predicate = table.read_rows(&[], &[Predicate::new("nope", Operator::Eq, 1)]);

    assert!(matches!(projection, Err(LeafError::ColumnNotFound(_))));
    assert!(matches!(predicate, Err(LeafError::ColumnNotFound(_))));
}

#[test]
fn test_result_widths_and_display() {
    let (_dir, mut table) = setup_table();
    insert(&mut table, 1, "alexander");

    let result = table.read_rows(&[], &[]).unwrap();
    assert_eq!(result.widths, vec![2, 9]);

    let text = result.to_string();
    assert!(text.contains("| id | name      |"));
    assert!(text.contains("| 1  | alexander |"));
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_matching_rows() {
    let (_dir, mut table) = setup_table();
    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        insert(&mut table, id, name);
    }
    let slots = table.slot_count().unwrap();

    let count = table
        .update_rows(
            "name",
            Value::from("z"),
            &[Predicate::new("id", Operator::Le, 2)],
        )
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(
        all_rows(&mut table),
        strings(&[("1", "z"), ("2", "z"), ("3", "c")])
    );
    assert_eq!(table.slot_count().unwrap(), slots);
}

#[test]
fn test_update_no_match() {
    let (_dir, mut table) = setup_table();
    insert(&mut table, 1, "a");

    let count = table
        .update_rows("name", Value::from("z"), &[Predicate::new("id", Operator::Eq, 9)])
        .unwrap();

    assert_eq!(count, 0);
    assert_eq!(all_rows(&mut table), strings(&[("1", "a")]));
}

#[test]
fn test_update_primary_key_rejected() {
    let (_dir, mut table) = setup_table();
    insert(&mut table, 1, "a");

    let result = table.update_rows("id", Value::Int(5), &[]);
    assert!(matches!(result, Err(LeafError::InvalidArgument(_))));
}

#[test]
fn test_update_too_large_rejected() {
    let (_dir, mut table) = setup_table();
    insert(&mut table, 1, "a");
    insert(&mut table, 2, "b");

    let big = "x".repeat(400);
    let result = table.update_rows("name", Value::from(big), &[]);

    assert!(matches!(result, Err(LeafError::CapacityExceeded(_))));
    assert_eq!(all_rows(&mut table), strings(&[("1", "a"), ("2", "b")]));
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_by_key() {
    let (_dir, mut table) = setup_table();
    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        insert(&mut table, id, name);
    }

    let count = table
        .delete_rows(&[Predicate::new("id", Operator::Eq, 2)])
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(all_rows(&mut table), strings(&[("1", "a"), ("3", "c")]));
}

#[test]
fn test_delete_by_non_key_column() {
    let (_dir, mut table) = setup_table();
    for (id, name) in [(1, "x"), (2, "y"), (3, "x")] {
        insert(&mut table, id, name);
    }

    let count = table
        .delete_rows(&[Predicate::new("name", Operator::Eq, "x")])
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(all_rows(&mut table), strings(&[("2", "y")]));
}

#[test]
fn test_delete_everything_then_reinsert() {
    let (dir, mut table) = setup_table();
    for id in 1..=10 {
        insert(&mut table, id, "v");
    }

    assert_eq!(table.delete_rows(&[]).unwrap(), 10);
    assert_eq!(table.row_count().unwrap(), 0);

    insert(&mut table, 5, "back");
    drop(table);

    let mut table = Table::open(dir.path(), "t", options()).unwrap();
    assert_eq!(all_rows(&mut table), strings(&[("5", "back")]));
}

// =============================================================================
// Drop Tests
// =============================================================================

#[test]
fn test_drop_removes_files_and_invalidates() {
    let (_dir, mut table) = setup_table();
    insert(&mut table, 1, "a");
    let files = table.files().clone();

    table.drop_table().unwrap();

    for path in files.all() {
        assert!(!path.exists());
    }
    assert!(table.is_dropped());
    assert!(matches!(table.read_rows(&[], &[]), Err(LeafError::TableDropped(_))));
    assert!(matches!(
        table.insert_row(vec![Value::Int(2), Value::from("b")]),
        Err(LeafError::TableDropped(_))
    ));
    assert!(matches!(table.drop_table(), Err(LeafError::TableDropped(_))));
}

#[test]
fn test_destroy_without_opening() {
    let (dir, table) = setup_table();
    drop(table);

    Table::destroy(dir.path(), "t").unwrap();

    assert!(matches!(
        Table::open(dir.path(), "t", options()),
        Err(LeafError::TableNotFound(_))
    ));
    assert!(matches!(
        Table::destroy(dir.path(), "t"),
        Err(LeafError::TableNotFound(_))
    ));
}
