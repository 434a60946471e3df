//! Error types for PolDB
//!
//! Provides a unified error type for all operations.
//!
//! Every failure in this crate is semantic, not transient; nothing is retried
//! internally. The engine carries no user-facing text beyond `Display`; the
//! CLI is responsible for presentation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using PoldbError
pub type Result<T> = std::result::Result<T, PoldbError>;

/// Unified error type for PolDB operations
#[derive(Debug, Error)]
pub enum PoldbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("database already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("invalid database format: {0}")]
    InvalidFormat(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("column not found: '{0}'")]
    ColumnNotFound(String),

    #[error("missing value for column '{0}'")]
    MissingColumn(String),

    #[error("duplicate value for key column '{column}'")]
    DuplicateKey { column: String },

    #[error("record in slot {0} is deleted")]
    RecordDeleted(usize),

    #[error("slot {slot} out of range (record count {count})")]
    SlotOutOfRange { slot: usize, count: u32 },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("unsupported type code: {0}")]
    UnsupportedType(u8),

    #[error("malformed value: {0}")]
    MalformedValue(String),

    #[error("value too long for column '{column}': {len} bytes (max {max})")]
    ValueTooLong { column: String, len: usize, max: u16 },

    // -------------------------------------------------------------------------
    // Adapter Errors
    // -------------------------------------------------------------------------
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
