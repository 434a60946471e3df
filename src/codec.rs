//! Value codec
//!
//! Encoding and decoding of a single typed value to/from its fixed-width byte
//! span inside a record slot. Stateless.
//!
//! ## Encodings (all big-endian)
//! - Int:   4-byte two's-complement
//! - Float: 8-byte IEEE-754 double
//! - Text:  UTF-8 bytes right-padded with `0x00` to the column width

use crate::error::{PoldbError, Result};
use crate::schema::Column;

/// Column data types and their on-disk type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColumnType {
    /// 32-bit signed integer, always 4 bytes
    Int = 1,
    /// 64-bit IEEE-754 double, always 8 bytes
    Float = 2,
    /// UTF-8 text with a fixed byte capacity
    Text = 3,
}

impl ColumnType {
    /// Parse a raw type code from a column descriptor
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(ColumnType::Int),
            2 => Ok(ColumnType::Float),
            3 => Ok(ColumnType::Text),
            other => Err(PoldbError::UnsupportedType(other)),
        }
    }

    /// Raw on-disk type code
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Human-readable name, also accepted by [`ColumnType::from_name`]
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
        }
    }

    /// Parse a type name as used in CLI column definitions
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "int" => Ok(ColumnType::Int),
            "float" => Ok(ColumnType::Float),
            // "str" is the historical spelling
            "text" | "str" => Ok(ColumnType::Text),
            other => Err(PoldbError::MalformedValue(format!(
                "unknown column type '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f64),
    Text(String),
}

impl Value {
    /// The column type this value belongs to
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::Float(_) => ColumnType::Float,
            Value::Text(_) => ColumnType::Text,
        }
    }

    /// Parse a textual value (CLI argument, CSV cell) into a typed value
    pub fn parse(input: &str, ty: ColumnType) -> Result<Self> {
        match ty {
            ColumnType::Int => input
                .trim()
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|e| PoldbError::MalformedValue(format!("'{}' as int: {}", input, e))),
            ColumnType::Float => input
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| PoldbError::MalformedValue(format!("'{}' as float: {}", input, e))),
            ColumnType::Text => Ok(Value::Text(input.to_string())),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

// =============================================================================
// Encoding / Decoding
// =============================================================================

/// Encode a value into its fixed-width byte span for the given column
///
/// Text longer than the column width is truncated to the width and a lossy
/// encoding diagnostic is emitted; the operation itself still succeeds.
/// Callers that must reject oversized input validate length beforehand.
pub fn encode_value(value: &Value, column: &Column) -> Result<Vec<u8>> {
    if value.column_type() != column.ty {
        return Err(PoldbError::MalformedValue(format!(
            "column '{}' expects {}, got {}",
            column.name,
            column.ty,
            value.column_type()
        )));
    }

    match value {
        Value::Int(v) => Ok(v.to_be_bytes().to_vec()),
        Value::Float(v) => Ok(v.to_be_bytes().to_vec()),
        Value::Text(v) => {
            let width = column.size as usize;
            let mut bytes = v.as_bytes().to_vec();
            if bytes.len() > width {
                tracing::warn!(
                    column = %column.name,
                    len = bytes.len(),
                    width,
                    "text value truncated to column width"
                );
                bytes.truncate(width);
            }
            bytes.resize(width, 0);
            Ok(bytes)
        }
    }
}

/// Decode a fixed-width byte span into a value for the given column
///
/// For text, trailing zero padding is stripped. A span that is not valid
/// UTF-8 after stripping fails with `MalformedValue`.
pub fn decode_value(bytes: &[u8], column: &Column) -> Result<Value> {
    if bytes.len() != column.size as usize {
        return Err(PoldbError::MalformedValue(format!(
            "column '{}': expected {} bytes, got {}",
            column.name,
            column.size,
            bytes.len()
        )));
    }

    match column.ty {
        ColumnType::Int => {
            let raw: [u8; 4] = bytes.try_into().unwrap();
            Ok(Value::Int(i32::from_be_bytes(raw)))
        }
        ColumnType::Float => {
            let raw: [u8; 8] = bytes.try_into().unwrap();
            Ok(Value::Float(f64::from_be_bytes(raw)))
        }
        ColumnType::Text => {
            let end = bytes
                .iter()
                .rposition(|&b| b != 0)
                .map(|p| p + 1)
                .unwrap_or(0);
            let text = std::str::from_utf8(&bytes[..end]).map_err(|e| {
                PoldbError::MalformedValue(format!("column '{}': invalid UTF-8: {}", column.name, e))
            })?;
            Ok(Value::Text(text.to_string()))
        }
    }
}
