//! Schema Module
//!
//! In-memory description of a database file's column list and the layout
//! constants derived from it, plus reading/writing of the file's metadata
//! region (header + column descriptors).
//!
//! ## File Format (all multi-byte integers big-endian)
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Header (18 bytes)                               │
//! │ ┌─────────┬───────────┬──────────┬────────────┐ │
//! │ │Magic (4)│Version (2)│Columns(2)│ Records(4) │ │
//! │ ├─────────┴──────┬────┴──────────┴────────────┤ │
//! │ │ RecordSize (2) │ DataOffset (4)             │ │
//! │ └────────────────┴────────────────────────────┘ │
//! ├─────────────────────────────────────────────────┤
//! │ Column Descriptors (36 bytes each)              │
//! │ ┌──────────┬─────────┬─────────┬─────────────┐  │
//! │ │Name (32) │ Type(1) │ Size(2) │  IsKey (1)  │  │
//! │ └──────────┴─────────┴─────────┴─────────────┘  │
//! ├─────────────────────────────────────────────────┤
//! │ Record Slots (RecordSize bytes each)            │
//! │ ┌───────────┬───────────────────────────────┐   │
//! │ │Tombstone  │ Encoded values, column order  │   │
//! │ └───────────┴───────────────────────────────┘   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The column list is immutable for the life of a file; there are no
//! add/drop/resize column operations.

use std::io::{Read, Write};

use crate::codec::ColumnType;
use crate::error::{PoldbError, Result};

/// Magic bytes identifying a PolDB file
pub const MAGIC: &[u8; 4] = b"PLDB";

/// Current file format version
pub const FORMAT_VERSION: u16 = 1;

/// Fixed header size in bytes
pub const HEADER_SIZE: u64 = 18;

/// Fixed size of one column descriptor in bytes
pub const DESCRIPTOR_SIZE: u64 = 36;

/// Byte capacity of a column name within a descriptor
pub const NAME_SIZE: usize = 32;

/// Byte offset of the record-count field within the header
pub const RECORD_COUNT_OFFSET: u64 = 8;

// =============================================================================
// Header
// =============================================================================

/// Parsed file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub column_count: u16,
    /// Total slot count, live and tombstoned. Never decremented.
    pub record_count: u32,
    /// Slot width in bytes, including the 1-byte tombstone prefix
    pub record_size: u16,
    /// Byte offset where the record area starts
    pub data_offset: u32,
}

impl Header {
    /// Read and validate the fixed 18-byte header
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                PoldbError::InvalidFormat("file too short for header".to_string())
            } else {
                PoldbError::Io(e)
            }
        })?;

        if &buf[0..4] != MAGIC {
            return Err(PoldbError::InvalidFormat(format!(
                "bad magic: expected PLDB, got {:?}",
                &buf[0..4]
            )));
        }

        let version = u16::from_be_bytes(buf[4..6].try_into().unwrap());
        if version != FORMAT_VERSION {
            return Err(PoldbError::InvalidFormat(format!(
                "unsupported format version: {}",
                version
            )));
        }

        Ok(Self {
            version,
            column_count: u16::from_be_bytes(buf[6..8].try_into().unwrap()),
            record_count: u32::from_be_bytes(buf[8..12].try_into().unwrap()),
            record_size: u16::from_be_bytes(buf[12..14].try_into().unwrap()),
            data_offset: u32::from_be_bytes(buf[14..18].try_into().unwrap()),
        })
    }

    /// Serialize the header into its fixed 18-byte form
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_be_bytes());
        buf[6..8].copy_from_slice(&self.column_count.to_be_bytes());
        buf[8..12].copy_from_slice(&self.record_count.to_be_bytes());
        buf[12..14].copy_from_slice(&self.record_size.to_be_bytes());
        buf[14..18].copy_from_slice(&self.data_offset.to_be_bytes());
        buf
    }
}

// =============================================================================
// Columns
// =============================================================================

/// One typed column in the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name, at most [`NAME_SIZE`] UTF-8 bytes
    pub name: String,
    pub ty: ColumnType,
    /// Encoded value width in bytes
    pub size: u16,
    /// Whether live values in this column must be pairwise distinct
    pub is_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType, size: u16, is_key: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            size,
            is_key,
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Ordered column list plus the derived layout constants
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
    /// Byte offset of each column's value within a record slot
    value_offsets: Vec<u64>,
    record_size: u16,
    data_offset: u32,
}

impl Schema {
    /// Build a schema from a column list, validating widths and names
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.len() > u16::MAX as usize {
            return Err(PoldbError::InvalidSchema(format!(
                "too many columns: {}",
                columns.len()
            )));
        }

        let mut payload: u64 = 0;
        for column in &columns {
            if column.name.is_empty() {
                return Err(PoldbError::InvalidSchema("empty column name".to_string()));
            }
            if column.name.len() > NAME_SIZE {
                return Err(PoldbError::InvalidSchema(format!(
                    "column name '{}' exceeds {} bytes",
                    column.name, NAME_SIZE
                )));
            }
            match column.ty {
                ColumnType::Int if column.size != 4 => {
                    return Err(PoldbError::InvalidSchema(format!(
                        "int column '{}' must be 4 bytes, got {}",
                        column.name, column.size
                    )));
                }
                ColumnType::Float if column.size != 8 => {
                    return Err(PoldbError::InvalidSchema(format!(
                        "float column '{}' must be 8 bytes, got {}",
                        column.name, column.size
                    )));
                }
                ColumnType::Text if column.size == 0 => {
                    return Err(PoldbError::InvalidSchema(format!(
                        "text column '{}' must be at least 1 byte wide",
                        column.name
                    )));
                }
                _ => {}
            }
            payload += column.size as u64;
        }

        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(PoldbError::InvalidSchema(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }

        // Tombstone byte + encoded values must fit the u16 record-size field
        if 1 + payload > u16::MAX as u64 {
            return Err(PoldbError::InvalidSchema(format!(
                "record size {} exceeds maximum {}",
                1 + payload,
                u16::MAX
            )));
        }

        let mut value_offsets = Vec::with_capacity(columns.len());
        let mut offset: u64 = 1; // skip the tombstone byte
        for column in &columns {
            value_offsets.push(offset);
            offset += column.size as u64;
        }

        let record_size = offset as u16;
        let data_offset = (HEADER_SIZE + columns.len() as u64 * DESCRIPTOR_SIZE) as u32;

        Ok(Self {
            columns,
            value_offsets,
            record_size,
            data_offset,
        })
    }

    /// Read the schema (and the current record count) from the start of a file
    pub fn read_from<R: Read>(reader: &mut R) -> Result<(Self, u32)> {
        let header = Header::read_from(reader)?;

        let mut columns = Vec::with_capacity(header.column_count as usize);
        for _ in 0..header.column_count {
            let mut buf = [0u8; DESCRIPTOR_SIZE as usize];
            reader.read_exact(&mut buf).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    PoldbError::InvalidFormat("file too short for column descriptors".to_string())
                } else {
                    PoldbError::Io(e)
                }
            })?;

            let name_end = buf[..NAME_SIZE]
                .iter()
                .rposition(|&b| b != 0)
                .map(|p| p + 1)
                .unwrap_or(0);
            let name = std::str::from_utf8(&buf[..name_end])
                .map_err(|e| PoldbError::InvalidFormat(format!("column name not UTF-8: {}", e)))?
                .to_string();

            let ty = ColumnType::from_code(buf[32])?;
            let size = u16::from_be_bytes(buf[33..35].try_into().unwrap());
            let is_key = buf[35] != 0;

            columns.push(Column::new(name, ty, size, is_key));
        }

        let schema = Schema::new(columns)?;

        // The stored layout fields must agree with what the descriptors imply
        if header.record_size != schema.record_size || header.data_offset != schema.data_offset {
            return Err(PoldbError::InvalidFormat(format!(
                "header layout mismatch: record_size {} / data_offset {} vs computed {} / {}",
                header.record_size, header.data_offset, schema.record_size, schema.data_offset
            )));
        }

        Ok((schema, header.record_count))
    }

    /// Write the header (with the given record count) and all descriptors
    pub fn write_to<W: Write>(&self, writer: &mut W, record_count: u32) -> Result<()> {
        let header = Header {
            version: FORMAT_VERSION,
            column_count: self.columns.len() as u16,
            record_count,
            record_size: self.record_size,
            data_offset: self.data_offset,
        };
        writer.write_all(&header.to_bytes())?;

        for column in &self.columns {
            let mut buf = [0u8; DESCRIPTOR_SIZE as usize];
            buf[..column.name.len()].copy_from_slice(column.name.as_bytes());
            buf[32] = column.ty.code();
            buf[33..35].copy_from_slice(&column.size.to_be_bytes());
            buf[35] = column.is_key as u8;
            writer.write_all(&buf)?;
        }

        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Ordered column list
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns flagged as key, in declaration order
    pub fn key_columns(&self) -> impl Iterator<Item = (usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_key)
    }

    /// Look up a column by name, returning its positional index
    pub fn column(&self, name: &str) -> Result<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
            .ok_or_else(|| PoldbError::ColumnNotFound(name.to_string()))
    }

    /// Slot width in bytes, including the tombstone prefix
    pub fn record_size(&self) -> u16 {
        self.record_size
    }

    /// Byte offset where the record area starts
    pub fn data_offset(&self) -> u32 {
        self.data_offset
    }

    /// Byte offset of a column's value within a record slot
    pub fn value_offset(&self, column_index: usize) -> u64 {
        self.value_offsets[column_index]
    }

    /// Absolute byte offset of a record slot
    pub fn slot_offset(&self, slot: u32) -> u64 {
        self.data_offset as u64 + slot as u64 * self.record_size as u64
    }
}
