//! Tests for row encoding, literals and predicates
//!
//! These tests verify:
//! - Row layout: u32 length prefix per field, i32 LE ints, UTF-8 strings
//! - Decoding rejects malformed rows
//! - Literal parsing and coercion to column types
//! - Row filtering compares the text form of both types
//! - Predicate parsing and binding

use std::cmp::Ordering;

use leafdb::index::Operator;
use leafdb::schema::{Column, ColumnType, Schema, Value};
use leafdb::table::{decode_row, encode_row, Predicate};
use leafdb::LeafError;

// =============================================================================
// Helper Functions
// =============================================================================

/// (id int primary, name string, age int)
fn people_schema() -> Schema {
    Schema::new(
        vec![
            Column::new("id", ColumnType::Int),
            Column::new("name", ColumnType::Str),
            Column::new("age", ColumnType::Int),
        ],
        0,
    )
    .unwrap()
}

fn row(id: i32, name: &str, age: i32) -> Vec<Value> {
    vec![Value::Int(id), Value::from(name), Value::Int(age)]
}

// =============================================================================
// Row Codec Tests
// =============================================================================

#[test]
fn test_encode_row_layout() {
    let bytes = encode_row(&people_schema(), &row(-2, "bo", 40)).unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(&4u32.to_le_bytes());
    expected.extend_from_slice(&(-2i32).to_le_bytes());
    expected.extend_from_slice(&2u32.to_le_bytes());
    expected.extend_from_slice(b"bo");
    expected.extend_from_slice(&4u32.to_le_bytes());
    expected.extend_from_slice(&40i32.to_le_bytes());

    assert_eq!(bytes, expected);
}

#[test]
fn test_row_decodes_back() {
    let schema = people_schema();
    let values = row(7, "héllo wörld", i32::MIN);

    let bytes = encode_row(&schema, &values).unwrap();
    assert_eq!(decode_row(&schema, &bytes).unwrap(), values);
}

#[test]
fn test_empty_string_field() {
    let schema = people_schema();
    let values = row(1, "", 0);

    let bytes = encode_row(&schema, &values).unwrap();
    assert_eq!(bytes.len(), 4 + 4 + 4 + 4 + 4);
    assert_eq!(decode_row(&schema, &bytes).unwrap(), values);
}

#[test]
fn test_encode_rejects_wrong_count() {
    let result = encode_row(&people_schema(), &[Value::Int(1)]);
    assert!(matches!(result, Err(LeafError::SchemaMismatch(_))));
}

#[test]
fn test_encode_rejects_wrong_type() {
    let values = vec![Value::from("one"), Value::from("x"), Value::Int(1)];

    let result = encode_row(&people_schema(), &values);
    assert!(matches!(result, Err(LeafError::SchemaMismatch(_))));
}

#[test]
fn test_decode_rejects_malformed_rows() {
    let schema = people_schema();
    let good = encode_row(&schema, &row(1, "abc", 2)).unwrap();

    // Truncated
    assert!(matches!(
        decode_row(&schema, &good[..good.len() - 1]),
        Err(LeafError::Corruption(_))
    ));

    // Trailing garbage
    let mut long = good.clone();
    long.push(0);
    assert!(matches!(decode_row(&schema, &long), Err(LeafError::Corruption(_))));

    // Int field with a length other than 4
    let mut bad_int = good.clone();
    bad_int[0] = 3;
    assert!(matches!(decode_row(&schema, &bad_int), Err(LeafError::Corruption(_))));

    // Invalid UTF-8 in a string field
    let mut bad_utf8 = good;
    bad_utf8[12] = 0xFF;
    assert!(matches!(decode_row(&schema, &bad_utf8), Err(LeafError::Corruption(_))));
}

// =============================================================================
// Literal Tests
// =============================================================================

#[test]
fn test_parse_literal_ints() {
    assert_eq!(Value::parse_literal("42"), Value::Int(42));
    assert_eq!(Value::parse_literal("-7"), Value::Int(-7));
    assert_eq!(Value::parse_literal(" 3 "), Value::Int(3));
    assert_eq!(Value::parse_literal("2147483647"), Value::Int(i32::MAX));
}

#[test]
fn test_parse_literal_strings() {
    assert_eq!(Value::parse_literal("bob"), Value::from("bob"));
    assert_eq!(Value::parse_literal("\"bob\""), Value::from("bob"));
    assert_eq!(Value::parse_literal("'a b'"), Value::from("a b"));
    assert_eq!(Value::parse_literal("\"42\""), Value::from("42"));
    assert_eq!(Value::parse_literal("1.5"), Value::from("1.5"));
    assert_eq!(Value::parse_literal("-"), Value::from("-"));
    // Out of i32 range stays a string
    assert_eq!(Value::parse_literal("99999999999"), Value::from("99999999999"));
}

#[test]
fn test_coerce_between_types() {
    assert_eq!(
        Value::Int(5).coerce(ColumnType::Str).unwrap(),
        Value::from("5")
    );
    assert_eq!(
        Value::from("12").coerce(ColumnType::Int).unwrap(),
        Value::Int(12)
    );
    assert!(matches!(
        Value::from("twelve").coerce(ColumnType::Int),
        Err(LeafError::SchemaMismatch(_))
    ));
}

#[test]
fn test_parse_literal_keeps_non_canonical_digits() {
    for text in ["007", "-0", "0010", "+5"] {
        let value = Value::parse_literal(text);
        assert_eq!(value, Value::from(text), "{}", text);
        assert_eq!(value.clone().coerce(ColumnType::Str).unwrap(), Value::from(text));
    }

    // An int column still reads the number
    assert_eq!(
        Value::parse_literal("007").coerce(ColumnType::Int).unwrap(),
        Value::Int(7)
    );
}

#[test]
fn test_compare_text() {
    // Decimal text, not numeric order
    assert_eq!(Value::Int(10).compare_text(&Value::Int(9)), Ordering::Less);
    assert_eq!(Value::Int(-1).compare_text(&Value::Int(0)), Ordering::Less);
    assert_eq!(Value::Int(7).compare_text(&Value::Int(7)), Ordering::Equal);
    // Bytewise strings
    assert_eq!(Value::from("B").compare_text(&Value::from("a")), Ordering::Less);
    assert_eq!(Value::from("ab").compare_text(&Value::from("a")), Ordering::Greater);
}

// =============================================================================
// Predicate Tests
// =============================================================================

#[test]
fn test_parse_predicates() {
    let cases = [
        ("id=1", "id", Operator::Eq, Value::Int(1)),
        ("id>=2", "id", Operator::Ge, Value::Int(2)),
        ("id<=2", "id", Operator::Le, Value::Int(2)),
        ("age > 30", "age", Operator::Gt, Value::Int(30)),
        ("age<-1", "age", Operator::Lt, Value::Int(-1)),
        ("name = \"bob\"", "name", Operator::Eq, Value::from("bob")),
    ];

    for (text, column, op, value) in cases {
        let predicate: Predicate = text.parse().unwrap();
        assert_eq!(predicate, Predicate::new(column, op, value), "{}", text);
    }
}

#[test]
fn test_parse_predicate_errors() {
    for text in ["id", "=1", "  >= 4", "id!1"] {
        let result = text.parse::<Predicate>();
        assert!(
            matches!(result, Err(LeafError::InvalidArgument(_))),
            "accepted '{}'",
            text
        );
    }
}

#[test]
fn test_bind_coerces_literal() {
    let schema = people_schema();

    let bound = Predicate::new("name", Operator::Eq, 5).bind(&schema).unwrap();
    assert_eq!(bound.position, 1);
    assert_eq!(bound.value, Value::from("5"));

    let bound = Predicate::new("age", Operator::Gt, "30").bind(&schema).unwrap();
    assert_eq!(bound.value, Value::Int(30));
}

#[test]
fn test_bind_errors() {
    let schema = people_schema();

    assert!(matches!(
        Predicate::new("missing", Operator::Eq, 1).bind(&schema),
        Err(LeafError::ColumnNotFound(_))
    ));
    assert!(matches!(
        Predicate::new("age", Operator::Eq, "old").bind(&schema),
        Err(LeafError::SchemaMismatch(_))
    ));
}

#[test]
fn test_bound_matches_rows() {
    let schema = people_schema();
    let young = row(1, "ann", 20);
    let old = row(2, "bob", 60);

    let over_30 = Predicate::new("age", Operator::Gt, 30).bind(&schema).unwrap();
    assert!(!over_30.matches(&young));
    assert!(over_30.matches(&old));

    let name_le_b = Predicate::new("name", Operator::Le, "b").bind(&schema).unwrap();
    assert!(name_le_b.matches(&young));
    assert!(!name_le_b.matches(&old));

    // Ints are compared through their text
    let over_9 = Predicate::new("age", Operator::Gt, 9).bind(&schema).unwrap();
    assert!(!over_9.matches(&row(3, "cy", 10)));
    assert!(over_9.matches(&row(4, "di", 90)));
}
