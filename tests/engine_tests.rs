//! Tests for the storage engine
//!
//! These tests verify:
//! - Create/open semantics and failure modes
//! - Append with key uniqueness and tombstoned-slot reuse
//! - Linear-scan search with tombstone exclusion
//! - Delete policies and non-shrinking record counts
//! - Field updates against live and deleted slots

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use poldb::{Column, ColumnType, Engine, PoldbError, Schema, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.poldb");
    (temp_dir, db_path)
}

/// (id:int key, name:text(10)) schema
fn id_name_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::Int, 4, true),
        Column::new("name", ColumnType::Text, 10, false),
    ])
    .unwrap()
}

fn id_name(id: i32, name: &str) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), Value::Int(id));
    fields.insert("name".to_string(), Value::Text(name.to_string()));
    fields
}

fn create_id_name_db(path: &Path) -> Engine {
    Engine::create(path, id_name_schema()).unwrap()
}

// =============================================================================
// Create / Open
// =============================================================================

#[test]
fn test_create_writes_metadata_only() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);

    assert_eq!(engine.record_count().unwrap(), 0);
    // Header + 2 descriptors, no record area yet
    assert_eq!(fs::metadata(&db_path).unwrap().len(), 18 + 2 * 36);
}

#[test]
fn test_create_fails_on_existing_path() {
    let (_temp, db_path) = setup_temp_db();
    create_id_name_db(&db_path);

    let err = Engine::create(&db_path, id_name_schema()).unwrap_err();
    assert!(matches!(err, PoldbError::AlreadyExists(_)));
}

#[test]
fn test_open_missing_path() {
    let (_temp, db_path) = setup_temp_db();
    let err = Engine::open(&db_path).unwrap_err();
    assert!(matches!(err, PoldbError::NotFound(_)));
}

#[test]
fn test_open_loads_schema() {
    let (_temp, db_path) = setup_temp_db();
    create_id_name_db(&db_path);

    let engine = Engine::open(&db_path).unwrap();
    assert_eq!(engine.schema(), &id_name_schema());
}

#[test]
fn test_open_rejects_non_poldb_file() {
    let (_temp, db_path) = setup_temp_db();
    fs::write(&db_path, b"not a database at all").unwrap();

    let err = Engine::open(&db_path).unwrap_err();
    assert!(matches!(err, PoldbError::InvalidFormat(_)));
}

// =============================================================================
// Append
// =============================================================================

#[test]
fn test_append_returns_slot_indices() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);

    assert_eq!(engine.append(&id_name(1, "a")).unwrap(), 0);
    assert_eq!(engine.append(&id_name(2, "b")).unwrap(), 1);
    assert_eq!(engine.record_count().unwrap(), 2);
}

#[test]
fn test_append_missing_column() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);

    let mut partial = HashMap::new();
    partial.insert("id".to_string(), Value::Int(1));

    let err = engine.append(&partial).unwrap_err();
    assert!(matches!(err, PoldbError::MissingColumn(name) if name == "name"));
    assert_eq!(engine.record_count().unwrap(), 0);
}

#[test]
fn test_duplicate_key_rejected_without_side_effects() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();
    engine.append(&id_name(2, "b")).unwrap();
    let len_before = fs::metadata(&db_path).unwrap().len();

    let err = engine.append(&id_name(2, "dup")).unwrap_err();
    assert!(matches!(err, PoldbError::DuplicateKey { column } if column == "id"));

    // Record count and slot contents unchanged after the failed attempt
    assert_eq!(engine.record_count().unwrap(), 2);
    assert_eq!(fs::metadata(&db_path).unwrap().len(), len_before);
    let rows = engine.search("id", &Value::Int(2)).unwrap();
    assert_eq!(rows[0].values[1], Value::Text("b".to_string()));
}

#[test]
fn test_key_uniqueness_ignores_tombstones() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();
    engine.delete("id", &Value::Int(1)).unwrap();

    // id=1 only exists in a tombstoned slot, so it is free again
    engine.append(&id_name(1, "again")).unwrap();
    let rows = engine.search("id", &Value::Int(1)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values[1], Value::Text("again".to_string()));
}

#[test]
fn test_append_reuses_first_tombstoned_slot() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();
    engine.append(&id_name(2, "b")).unwrap();
    engine.append(&id_name(3, "c")).unwrap();

    engine.delete("id", &Value::Int(2)).unwrap();
    let len_before = fs::metadata(&db_path).unwrap().len();

    // Exactly one tombstoned slot: the append must land there, not extend
    let slot = engine.append(&id_name(4, "d")).unwrap();
    assert_eq!(slot, 1);
    assert_eq!(engine.record_count().unwrap(), 3);
    assert_eq!(fs::metadata(&db_path).unwrap().len(), len_before);
}

// =============================================================================
// Search
// =============================================================================

#[test]
fn test_search_unknown_column() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);

    let err = engine.search("missing", &Value::Int(1)).unwrap_err();
    assert!(matches!(err, PoldbError::ColumnNotFound(_)));
}

#[test]
fn test_search_returns_matches_in_slot_order() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "same")).unwrap();
    engine.append(&id_name(2, "other")).unwrap();
    engine.append(&id_name(3, "same")).unwrap();

    let rows = engine.search("name", &Value::Text("same".to_string())).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].slot, 0);
    assert_eq!(rows[1].slot, 2);
    assert_eq!(rows[0].values[0], Value::Int(1));
    assert_eq!(rows[1].values[0], Value::Int(3));
}

#[test]
fn test_search_no_match_is_empty_not_error() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();

    assert!(engine.search("id", &Value::Int(99)).unwrap().is_empty());
}

#[test]
fn test_search_with_mismatched_value_type_matches_nothing() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();

    let rows = engine
        .search("id", &Value::Text("1".to_string()))
        .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_search_float_column() {
    let (_temp, db_path) = setup_temp_db();
    let schema = Schema::new(vec![
        Column::new("id", ColumnType::Int, 4, true),
        Column::new("salary", ColumnType::Float, 8, false),
    ])
    .unwrap();
    let engine = Engine::create(&db_path, schema).unwrap();

    let mut fields = HashMap::new();
    fields.insert("id".to_string(), Value::Int(1));
    fields.insert("salary".to_string(), Value::Float(75000.0));
    engine.append(&fields).unwrap();

    let rows = engine.search("salary", &Value::Float(75000.0)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values[0], Value::Int(1));
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn test_delete_unknown_column() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);

    let err = engine.delete("missing", &Value::Int(1)).unwrap_err();
    assert!(matches!(err, PoldbError::ColumnNotFound(_)));
}

#[test]
fn test_deleted_records_never_surface() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();
    engine.append(&id_name(2, "b")).unwrap();

    assert_eq!(engine.delete("id", &Value::Int(1)).unwrap(), 1);

    // The tombstoned slot is invisible to every query shape
    assert!(engine.search("id", &Value::Int(1)).unwrap().is_empty());
    assert!(engine
        .search("name", &Value::Text("a".to_string()))
        .unwrap()
        .is_empty());
    assert_eq!(engine.scan().unwrap().len(), 1);

    // But the slot itself is still allocated
    assert_eq!(engine.record_count().unwrap(), 2);
}

#[test]
fn test_non_key_delete_is_exhaustive() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "it")).unwrap();
    engine.append(&id_name(2, "hr")).unwrap();
    engine.append(&id_name(3, "it")).unwrap();
    engine.append(&id_name(4, "it")).unwrap();

    let deleted = engine.delete("name", &Value::Text("it".to_string())).unwrap();
    assert_eq!(deleted, 3);
    assert!(engine
        .search("name", &Value::Text("it".to_string()))
        .unwrap()
        .is_empty());
    assert_eq!(engine.scan().unwrap().len(), 1);
}

#[test]
fn test_delete_no_match_returns_zero() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();

    assert_eq!(engine.delete("id", &Value::Int(9)).unwrap(), 0);
    assert_eq!(engine.scan().unwrap().len(), 1);
}

// =============================================================================
// End-to-End Scenario
// =============================================================================

#[test]
fn test_append_search_delete_reuse_scenario() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);

    engine.append(&id_name(1, "a")).unwrap();
    engine.append(&id_name(2, "b")).unwrap();

    let rows = engine.search("id", &Value::Int(2)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values, vec![Value::Int(2), Value::Text("b".to_string())]);

    assert_eq!(engine.delete("id", &Value::Int(1)).unwrap(), 1);
    assert!(engine.search("id", &Value::Int(1)).unwrap().is_empty());

    // The tombstoned id=1 slot is reused; the slot count stays 2
    let slot = engine.append(&id_name(3, "c")).unwrap();
    assert_eq!(slot, 0);
    assert_eq!(engine.record_count().unwrap(), 2);

    let err = engine.append(&id_name(2, "dup")).unwrap_err();
    assert!(matches!(err, PoldbError::DuplicateKey { .. }));
}

// =============================================================================
// Update Field
// =============================================================================

#[test]
fn test_update_field_overwrites_one_column() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    let slot = engine.append(&id_name(1, "before")).unwrap();

    engine
        .update_field(slot, "name", &Value::Text("after".to_string()))
        .unwrap();

    let rows = engine.search("id", &Value::Int(1)).unwrap();
    assert_eq!(rows[0].values[1], Value::Text("after".to_string()));
}

#[test]
fn test_update_field_on_deleted_slot() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    let slot = engine.append(&id_name(1, "a")).unwrap();
    engine.delete("id", &Value::Int(1)).unwrap();

    let err = engine
        .update_field(slot, "name", &Value::Text("x".to_string()))
        .unwrap_err();
    assert!(matches!(err, PoldbError::RecordDeleted(0)));
}

#[test]
fn test_update_field_out_of_range() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();

    let err = engine
        .update_field(5, "name", &Value::Text("x".to_string()))
        .unwrap_err();
    assert!(matches!(err, PoldbError::SlotOutOfRange { slot: 5, count: 1 }));
}

#[test]
fn test_update_field_unknown_column() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();

    let err = engine
        .update_field(0, "missing", &Value::Int(0))
        .unwrap_err();
    assert!(matches!(err, PoldbError::ColumnNotFound(_)));
}

// =============================================================================
// Scan / Row Handles
// =============================================================================

#[test]
fn test_scan_returns_live_rows_with_slot_handles() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(1, "a")).unwrap();
    engine.append(&id_name(2, "b")).unwrap();
    engine.append(&id_name(3, "c")).unwrap();
    engine.delete("id", &Value::Int(2)).unwrap();

    let rows = engine.scan().unwrap();
    let slots: Vec<usize> = rows.iter().map(|r| r.slot).collect();
    assert_eq!(slots, vec![0, 2]);
}

#[test]
fn test_row_get_by_name() {
    let (_temp, db_path) = setup_temp_db();
    let engine = create_id_name_db(&db_path);
    engine.append(&id_name(7, "g")).unwrap();

    let rows = engine.scan().unwrap();
    assert_eq!(
        rows[0].get(engine.schema(), "id"),
        Some(&Value::Int(7))
    );
    assert_eq!(rows[0].get(engine.schema(), "missing"), None);
}

// =============================================================================
// Durability Shape
// =============================================================================

#[test]
fn test_reopen_sees_all_mutations() {
    let (_temp, db_path) = setup_temp_db();
    {
        let engine = create_id_name_db(&db_path);
        engine.append(&id_name(1, "a")).unwrap();
        engine.append(&id_name(2, "b")).unwrap();
        engine.delete("id", &Value::Int(1)).unwrap();
    }

    let engine = Engine::open(&db_path).unwrap();
    assert_eq!(engine.record_count().unwrap(), 2);
    let rows = engine.scan().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values[0], Value::Int(2));
}
