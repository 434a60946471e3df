//! # PolDB
//!
//! A minimal single-file record store with:
//! - A fixed schema of typed columns (int, float, fixed-capacity text)
//! - Fixed-width binary records behind an 18-byte header
//! - Soft deletion via a per-slot tombstone byte, with slot reuse on append
//! - Whole-file linear scans for lookup, deliberately no indexes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CLI / CSV Adapter / Presentation                │
//! │            (consume the engine's public contract)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │      create / append / search / delete / update / scan       │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!     ┌─────────────┐                    ┌─────────────┐
//!     │   Schema    │                    │    Codec    │
//!     │ (header +   │                    │ (per-field  │
//!     │ descriptors)│                    │  encoding)  │
//!     └──────┬──────┘                    └──────┬──────┘
//!            └──────────────┬──────────────────┘
//!                           ▼
//!                 single schema-described file
//! ```
//!
//! Out of scope by design: indexing structures, concurrent writers,
//! transactions/WAL, variable-length records, schema migration.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;

pub mod codec;
pub mod schema;
pub mod engine;
pub mod adapter;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PoldbError, Result};
pub use codec::{ColumnType, Value};
pub use schema::{Column, Schema};
pub use engine::{Engine, Row};
pub use adapter::{export_csv, import_csv, ImportSpec};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of PolDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
