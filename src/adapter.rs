//! CSV Import/Export Adapter
//!
//! Translates CSV rows to and from records using only the engine's public
//! operations; the adapter never touches file offsets itself.
//!
//! Import is fail-fast: the database file is created first, then rows are
//! appended one at a time, and the first bad row aborts the import (rows
//! already appended stay in the file).

use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::codec::{ColumnType, Value};
use crate::engine::Engine;
use crate::error::{PoldbError, Result};
use crate::schema::{Column, Schema};

/// Per-column declarations an import needs on top of the CSV header row
///
/// The header row supplies the column names and their order; this spec
/// supplies the type, the byte width, and the key flag for each of them.
#[derive(Debug, Clone, Default)]
pub struct ImportSpec {
    /// Names of the key columns
    pub key_columns: Vec<String>,
    /// Column name → data type
    pub column_types: HashMap<String, ColumnType>,
    /// Column name → encoded width in bytes
    pub column_sizes: HashMap<String, u16>,
}

/// Import a CSV file into a freshly created database
///
/// The CSV's header row defines the column order. Every header column must
/// have a declared type and size; every declared key column must appear in
/// the header. Cells are validated before encoding: unparseable cells fail
/// with `MalformedValue` (with row context) and oversized text fails with
/// `ValueTooLong` rather than being lossily truncated.
///
/// Returns the number of records imported.
pub fn import_csv(
    csv_path: impl AsRef<Path>,
    db_path: impl AsRef<Path>,
    spec: &ImportSpec,
) -> Result<u64> {
    let csv_path = csv_path.as_ref();
    if !csv_path.exists() {
        return Err(PoldbError::NotFound(csv_path.to_path_buf()));
    }

    // Flexible so short/long rows reach our own arity check with row context
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(csv_path)?;

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(PoldbError::InvalidSchema("CSV file has no header row".to_string()));
    }

    for key in &spec.key_columns {
        if !headers.iter().any(|h| h == key) {
            return Err(PoldbError::InvalidSchema(format!(
                "key column '{}' not present in CSV header",
                key
            )));
        }
    }

    let mut columns = Vec::with_capacity(headers.len());
    for name in headers.iter() {
        let ty = *spec.column_types.get(name).ok_or_else(|| {
            PoldbError::InvalidSchema(format!("no declared type for CSV column '{}'", name))
        })?;
        // Int/float widths are fixed by the codec; only text must be declared.
        let size = match (ty, spec.column_sizes.get(name).copied()) {
            (_, Some(size)) => size,
            (ColumnType::Int, None) => 4,
            (ColumnType::Float, None) => 8,
            (ColumnType::Text, None) => {
                return Err(PoldbError::InvalidSchema(format!(
                    "no declared size for CSV column '{}'",
                    name
                )));
            }
        };
        let is_key = spec.key_columns.iter().any(|k| k == name);
        columns.push(Column::new(name, ty, size, is_key));
    }

    let schema = Schema::new(columns)?;
    let engine = Engine::create(db_path, schema)?;

    let mut imported: u64 = 0;
    for (row_index, record) in reader.records().enumerate() {
        let record = record?;
        // Header row is line 1
        let line = row_index + 2;

        let columns = engine.schema().columns();
        if record.len() != columns.len() {
            return Err(PoldbError::MalformedValue(format!(
                "row {}: expected {} columns, found {}",
                line,
                columns.len(),
                record.len()
            )));
        }

        let mut fields = HashMap::with_capacity(columns.len());
        for (column, cell) in columns.iter().zip(record.iter()) {
            if column.ty == ColumnType::Text && cell.len() > column.size as usize {
                return Err(PoldbError::ValueTooLong {
                    column: column.name.clone(),
                    len: cell.len(),
                    max: column.size,
                });
            }
            let value = Value::parse(cell, column.ty).map_err(|e| {
                PoldbError::MalformedValue(format!("row {}, column '{}': {}", line, column.name, e))
            })?;
            fields.insert(column.name.clone(), value);
        }

        engine.append(&fields)?;
        imported += 1;
    }

    tracing::info!(
        rows = imported,
        db = %engine.path().display(),
        "CSV import finished"
    );
    Ok(imported)
}

/// Export every live record of a database to a CSV file
///
/// Writes a header row of column names, then the live records in slot order.
/// Tombstoned slots never appear. Returns the number of data rows written.
pub fn export_csv(db_path: impl AsRef<Path>, csv_path: impl AsRef<Path>) -> Result<u64> {
    let engine = Engine::open(db_path)?;
    let mut writer = WriterBuilder::new().from_path(csv_path.as_ref())?;

    let names: Vec<&str> = engine
        .schema()
        .columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    writer.write_record(&names)?;

    let mut exported: u64 = 0;
    for row in engine.scan()? {
        let cells: Vec<String> = row.values.iter().map(|v| v.to_string()).collect();
        writer.write_record(&cells)?;
        exported += 1;
    }
    writer.flush()?;

    tracing::info!(
        rows = exported,
        csv = %csv_path.as_ref().display(),
        "CSV export finished"
    );
    Ok(exported)
}
