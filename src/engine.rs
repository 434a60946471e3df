//! Engine Module
//!
//! The storage engine: owns file I/O against a single schema-described
//! database file and exposes the primitive operations: create, append,
//! search, delete, field update, full scan.
//!
//! ## Resource model
//! Every operation opens the file, performs its I/O, and closes it again;
//! no handle is held between calls. Handles are released on every exit path
//! by drop. Single-threaded, synchronous, blocking I/O; no internal locking.
//! Concurrent writers against the same path are a documented limitation, not
//! a supported mode: callers serialize mutating access per file.
//!
//! ## Slot lifecycle
//! Slots are only ever tombstoned or reused, never compacted or
//! removed. The header's record count includes tombstoned slots and is
//! monotonically non-decreasing.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::codec::{decode_value, encode_value, Value};
use crate::error::{PoldbError, Result};
use crate::schema::{Header, Schema, RECORD_COUNT_OFFSET};

/// Tombstone byte for a live slot
const SLOT_LIVE: u8 = 0;

/// Tombstone byte for a deleted slot
const SLOT_DELETED: u8 = 1;

/// One decoded live record with its stable slot handle
///
/// The slot index is the handle callers hold on to: presentation layers
/// address records by slot, never by raw byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Slot index within the record area
    pub slot: usize,
    /// Decoded values in column declaration order
    pub values: Vec<Value>,
}

impl Row {
    /// Value of the named column, if declared
    pub fn get(&self, schema: &Schema, name: &str) -> Option<&Value> {
        let (index, _) = schema.column(name).ok()?;
        self.values.get(index)
    }
}

/// The storage engine for one database file
///
/// Holds the path and the schema cached at open/create time. The column list
/// is immutable for the life of a file, so the cached schema cannot go stale;
/// the record count is re-read from the header on every operation.
#[derive(Debug)]
pub struct Engine {
    path: PathBuf,
    schema: Schema,
}

impl Engine {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a new database file with the given schema
    ///
    /// Writes the header (record count 0) followed by the column descriptors.
    /// No record-area bytes are written; the slot count starts at 0.
    pub fn create(path: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(PoldbError::AlreadyExists(path.to_path_buf()));
        }

        let mut file = OpenOptions::new().create_new(true).write(true).open(path)?;
        schema.write_to(&mut file, 0)?;
        file.flush()?;

        tracing::debug!(path = %path.display(), columns = schema.columns().len(), "database created");

        Ok(Self {
            path: path.to_path_buf(),
            schema,
        })
    }

    /// Open an existing database file, loading and validating its schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PoldbError::NotFound(path.to_path_buf()));
        }

        let mut file = File::open(path)?;
        let (schema, _) = Schema::read_from(&mut file)?;

        Ok(Self {
            path: path.to_path_buf(),
            schema,
        })
    }

    /// The schema this engine was opened with
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Append a record, reusing the first tombstoned slot if one exists
    ///
    /// `fields` must supply a value for every declared column. Key-column
    /// uniqueness is checked against all live slots before anything is
    /// written, so a rejected append leaves the file untouched. Returns the
    /// slot index the record landed in.
    pub fn append(&self, fields: &HashMap<String, Value>) -> Result<usize> {
        let mut file = self.open_rw()?;
        let record_count = self.read_checked_header(&mut file)?.record_count;

        // Validate and encode every field up front; nothing is written until
        // the whole record is known good.
        let mut encoded = Vec::with_capacity(self.schema.columns().len());
        for column in self.schema.columns() {
            let value = fields
                .get(&column.name)
                .ok_or_else(|| PoldbError::MissingColumn(column.name.clone()))?;
            encoded.push(encode_value(value, column)?);
        }

        for (index, column) in self.schema.key_columns() {
            let value = &fields[&column.name];
            if self
                .find_live_match(&mut file, record_count, index, value)?
                .is_some()
            {
                return Err(PoldbError::DuplicateKey {
                    column: column.name.clone(),
                });
            }
        }

        // Reuse policy: first tombstoned slot wins, record count unchanged
        for slot in 0..record_count {
            if self.read_tombstone(&mut file, slot)? == SLOT_DELETED {
                self.write_slot(&mut file, slot, &encoded)?;
                tracing::debug!(slot, "record written into reused slot");
                return Ok(slot as usize);
            }
        }

        // No reusable slot: extend the file. The record bytes land before the
        // count is bumped, so a crash in between leaves an orphaned slot the
        // header does not acknowledge, never a counted slot with no data.
        self.write_slot(&mut file, record_count, &encoded)?;
        file.seek(SeekFrom::Start(RECORD_COUNT_OFFSET))?;
        file.write_all(&(record_count + 1).to_be_bytes())?;
        file.flush()?;

        tracing::debug!(slot = record_count, "record appended in new slot");
        Ok(record_count as usize)
    }

    /// Find all live records whose column equals the given value
    ///
    /// Full linear scan in slot order; only the target column is decoded per
    /// slot, and the whole record only for matches. Tombstoned slots never
    /// surface. A value whose type does not match the column simply matches
    /// nothing.
    pub fn search(&self, column_name: &str, value: &Value) -> Result<Vec<Row>> {
        let (column_index, _) = self.schema.column(column_name)?;

        let mut file = self.open_ro()?;
        let record_count = self.read_checked_header(&mut file)?.record_count;

        let mut rows = Vec::new();
        for slot in 0..record_count {
            if self.read_tombstone(&mut file, slot)? == SLOT_DELETED {
                continue;
            }
            let candidate = self.read_column_value(&mut file, slot, column_index)?;
            if candidate == *value {
                rows.push(self.read_row(&mut file, slot)?);
            }
        }

        Ok(rows)
    }

    /// Tombstone every live record whose column equals the given value
    ///
    /// Returns the number of records tombstoned. Key and non-key columns take
    /// the same linear scan; for a key column the live-uniqueness invariant
    /// means at most one slot can match. Only the tombstone byte is flipped;
    /// the slot's remaining bytes are left as-is and the record count never
    /// shrinks.
    pub fn delete(&self, column_name: &str, value: &Value) -> Result<usize> {
        let (column_index, _) = self.schema.column(column_name)?;

        let mut file = self.open_rw()?;
        let record_count = self.read_checked_header(&mut file)?.record_count;

        let mut deleted = 0;
        for slot in 0..record_count {
            if self.read_tombstone(&mut file, slot)? == SLOT_DELETED {
                continue;
            }
            let candidate = self.read_column_value(&mut file, slot, column_index)?;
            if candidate == *value {
                file.seek(SeekFrom::Start(self.schema.slot_offset(slot)))?;
                file.write_all(&[SLOT_DELETED])?;
                deleted += 1;
            }
        }

        tracing::debug!(column = column_name, deleted, "delete finished");
        Ok(deleted)
    }

    /// Overwrite a single column's value in an existing live slot
    ///
    /// Fails with `RecordDeleted` if the slot is tombstoned. Key columns are
    /// not re-validated for uniqueness here; refusing key edits is caller
    /// policy, not an engine concern.
    pub fn update_field(&self, slot: usize, column_name: &str, value: &Value) -> Result<()> {
        let (column_index, column) = self.schema.column(column_name)?;
        let encoded = encode_value(value, column)?;

        let mut file = self.open_rw()?;
        let record_count = self.read_checked_header(&mut file)?.record_count;

        if slot >= record_count as usize {
            return Err(PoldbError::SlotOutOfRange {
                slot,
                count: record_count,
            });
        }

        let slot = slot as u32;
        if self.read_tombstone(&mut file, slot)? == SLOT_DELETED {
            return Err(PoldbError::RecordDeleted(slot as usize));
        }

        let offset = self.schema.slot_offset(slot) + self.schema.value_offset(column_index);
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&encoded)?;
        file.flush()?;

        Ok(())
    }

    /// Decode every live record in slot order
    ///
    /// This is the full scan the presentation layer and the CSV export
    /// adapter consume.
    pub fn scan(&self) -> Result<Vec<Row>> {
        let mut file = self.open_ro()?;
        let record_count = self.read_checked_header(&mut file)?.record_count;

        let mut rows = Vec::with_capacity(record_count as usize);
        for slot in 0..record_count {
            if self.read_tombstone(&mut file, slot)? == SLOT_DELETED {
                continue;
            }
            rows.push(self.read_row(&mut file, slot)?);
        }

        Ok(rows)
    }

    /// Total slot count from the header, tombstoned slots included
    pub fn record_count(&self) -> Result<u32> {
        let mut file = self.open_ro()?;
        Ok(self.read_checked_header(&mut file)?.record_count)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_ro(&self) -> Result<File> {
        if !self.path.exists() {
            return Err(PoldbError::NotFound(self.path.clone()));
        }
        Ok(File::open(&self.path)?)
    }

    fn open_rw(&self) -> Result<File> {
        if !self.path.exists() {
            return Err(PoldbError::NotFound(self.path.clone()));
        }
        Ok(OpenOptions::new().read(true).write(true).open(&self.path)?)
    }

    /// Re-read the header and cross-check it against the cached schema
    ///
    /// Catches the file having been swapped or rewritten externally since
    /// this engine was opened.
    fn read_checked_header(&self, file: &mut File) -> Result<Header> {
        file.seek(SeekFrom::Start(0))?;
        let header = Header::read_from(file)?;

        if header.column_count as usize != self.schema.columns().len()
            || header.record_size != self.schema.record_size()
            || header.data_offset != self.schema.data_offset()
        {
            return Err(PoldbError::InvalidFormat(
                "file layout no longer matches the schema it was opened with".to_string(),
            ));
        }

        Ok(header)
    }

    fn read_tombstone(&self, file: &mut File, slot: u32) -> Result<u8> {
        file.seek(SeekFrom::Start(self.schema.slot_offset(slot)))?;
        let mut flag = [0u8; 1];
        file.read_exact(&mut flag)?;
        Ok(flag[0])
    }

    /// Decode only the given column's value from a slot
    fn read_column_value(&self, file: &mut File, slot: u32, column_index: usize) -> Result<Value> {
        let column = &self.schema.columns()[column_index];
        let offset = self.schema.slot_offset(slot) + self.schema.value_offset(column_index);

        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; column.size as usize];
        file.read_exact(&mut buf)?;

        decode_value(&buf, column)
    }

    /// Decode a whole live slot into a row
    fn read_row(&self, file: &mut File, slot: u32) -> Result<Row> {
        file.seek(SeekFrom::Start(self.schema.slot_offset(slot)))?;
        let mut buf = vec![0u8; self.schema.record_size() as usize];
        file.read_exact(&mut buf)?;

        let mut values = Vec::with_capacity(self.schema.columns().len());
        for (index, column) in self.schema.columns().iter().enumerate() {
            let start = self.schema.value_offset(index) as usize;
            let end = start + column.size as usize;
            values.push(decode_value(&buf[start..end], column)?);
        }

        Ok(Row {
            slot: slot as usize,
            values,
        })
    }

    /// Scan live slots for a column equal to `value`, returning the first hit
    fn find_live_match(
        &self,
        file: &mut File,
        record_count: u32,
        column_index: usize,
        value: &Value,
    ) -> Result<Option<u32>> {
        for slot in 0..record_count {
            if self.read_tombstone(file, slot)? == SLOT_DELETED {
                continue;
            }
            let candidate = self.read_column_value(file, slot, column_index)?;
            if candidate == *value {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    /// Write a full record (live tombstone byte + encoded fields) into a slot
    fn write_slot(&self, file: &mut File, slot: u32, encoded: &[Vec<u8>]) -> Result<()> {
        file.seek(SeekFrom::Start(self.schema.slot_offset(slot)))?;
        file.write_all(&[SLOT_LIVE])?;
        for field in encoded {
            file.write_all(field)?;
        }
        file.flush()?;
        Ok(())
    }
}
