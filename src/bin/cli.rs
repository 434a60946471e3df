//! PolDB CLI
//!
//! Command-line driver for PolDB database files: create, add, search, delete,
//! update, inspect, and CSV import/export.

use std::collections::HashMap;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use poldb::{Column, ColumnType, Engine, ImportSpec, PoldbError, Schema, Value};

/// PolDB CLI
#[derive(Parser, Debug)]
#[command(name = "poldb")]
#[command(about = "Single-file record store with typed columns and tombstone deletion")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new database file
    Create {
        /// Database file path
        path: String,

        /// Column definition as name:type[:size]; type is int, float or text
        #[arg(short, long = "column", required = true)]
        columns: Vec<String>,

        /// Name of a key column (repeatable); at least one is required
        #[arg(short, long = "key", required = true)]
        keys: Vec<String>,
    },

    /// Append a record
    Add {
        /// Database file path
        path: String,

        /// Field assignment as name=value, one per declared column
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,
    },

    /// Find records by column value
    Search {
        /// Database file path
        path: String,

        /// Column to match against
        column: String,

        /// Value to match
        value: String,
    },

    /// Tombstone records by column value
    Delete {
        /// Database file path
        path: String,

        /// Column to match against
        column: String,

        /// Value to match
        value: String,
    },

    /// Overwrite one field of a live record
    Update {
        /// Database file path
        path: String,

        /// Slot index of the record (as reported by search)
        #[arg(short, long)]
        slot: usize,

        /// Column to overwrite
        column: String,

        /// New value
        value: String,
    },

    /// Show schema and record counts
    Info {
        /// Database file path
        path: String,
    },

    /// Create a database from a CSV file
    Import {
        /// Source CSV path
        csv: String,

        /// Database file path to create
        path: String,

        /// Column type declaration as name:type[:size] for each CSV column
        #[arg(short, long = "column", required = true)]
        columns: Vec<String>,

        /// Name of a key column (repeatable); at least one is required
        #[arg(short, long = "key", required = true)]
        keys: Vec<String>,
    },

    /// Export all live records to a CSV file
    Export {
        /// Database file path
        path: String,

        /// Destination CSV path
        csv: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,poldb=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    if let Err(e) = run(Args::parse()) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> poldb::Result<()> {
    match args.command {
        Commands::Create {
            path,
            columns,
            keys,
        } => {
            let schema = parse_schema(&columns, &keys)?;
            Engine::create(&path, schema)?;
            println!("Database '{}' created.", path);
        }

        Commands::Add { path, fields } => {
            let engine = Engine::open(&path)?;
            let record = parse_fields(&engine, &fields)?;
            let slot = engine.append(&record)?;
            println!("Record added in slot {}.", slot);
        }

        Commands::Search {
            path,
            column,
            value,
        } => {
            let engine = Engine::open(&path)?;
            let value = parse_typed(&engine, &column, &value)?;
            let rows = engine.search(&column, &value)?;
            print_rows(&engine, &rows);
            println!("{} record(s) found.", rows.len());
        }

        Commands::Delete {
            path,
            column,
            value,
        } => {
            let engine = Engine::open(&path)?;
            let value = parse_typed(&engine, &column, &value)?;
            let deleted = engine.delete(&column, &value)?;
            println!("{} record(s) deleted.", deleted);
        }

        Commands::Update {
            path,
            slot,
            column,
            value,
        } => {
            let engine = Engine::open(&path)?;
            let (_, col) = engine.schema().column(&column)?;
            // Key edits are refused here, not by the engine
            if col.is_key {
                return Err(PoldbError::MalformedValue(format!(
                    "column '{}' is a key column and cannot be edited",
                    column
                )));
            }
            let value = parse_checked(col, &value)?;
            engine.update_field(slot, &column, &value)?;
            println!("Slot {} updated.", slot);
        }

        Commands::Info { path } => {
            let engine = Engine::open(&path)?;
            let total = engine.record_count()?;
            let live = engine.scan()?.len();

            println!("Database: {}", path);
            println!("Columns:");
            for column in engine.schema().columns() {
                println!(
                    "  {:<32} {:<6} {:>5} bytes{}",
                    column.name,
                    column.ty.name(),
                    column.size,
                    if column.is_key { "  [key]" } else { "" }
                );
            }
            println!("Record size: {} bytes", engine.schema().record_size());
            println!("Data offset: {} bytes", engine.schema().data_offset());
            println!("Slots: {} total, {} live", total, live);
        }

        Commands::Import {
            csv,
            path,
            columns,
            keys,
        } => {
            let spec = parse_import_spec(&columns, &keys)?;
            let rows = poldb::import_csv(&csv, &path, &spec)?;
            println!("Imported {} record(s) into '{}'.", rows, path);
        }

        Commands::Export { path, csv } => {
            let rows = poldb::export_csv(&path, &csv)?;
            println!("Exported {} record(s) to '{}'.", rows, csv);
        }
    }

    Ok(())
}

// =============================================================================
// Argument Parsing Helpers
// =============================================================================

/// Parse one name:type[:size] column definition
fn parse_column(definition: &str, keys: &[String]) -> poldb::Result<Column> {
    let mut parts = definition.splitn(3, ':');
    let name = parts
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PoldbError::MalformedValue(format!("bad column definition '{}'", definition)))?;
    let ty = ColumnType::from_name(parts.next().ok_or_else(|| {
        PoldbError::MalformedValue(format!("column '{}' is missing a type", name))
    })?)?;

    let size = match (parts.next(), ty) {
        (Some(raw), _) => raw.parse::<u16>().map_err(|e| {
            PoldbError::MalformedValue(format!("column '{}' size: {}", name, e))
        })?,
        (None, ColumnType::Int) => 4,
        (None, ColumnType::Float) => 8,
        (None, ColumnType::Text) => {
            return Err(PoldbError::MalformedValue(format!(
                "text column '{}' needs an explicit size",
                name
            )));
        }
    };

    Ok(Column::new(name, ty, size, keys.iter().any(|k| k == name)))
}

fn parse_schema(definitions: &[String], keys: &[String]) -> poldb::Result<Schema> {
    let columns = definitions
        .iter()
        .map(|d| parse_column(d, keys))
        .collect::<poldb::Result<Vec<_>>>()?;

    for key in keys {
        if !columns.iter().any(|c| &c.name == key) {
            return Err(PoldbError::ColumnNotFound(key.clone()));
        }
    }

    Schema::new(columns)
}

fn parse_import_spec(definitions: &[String], keys: &[String]) -> poldb::Result<ImportSpec> {
    let mut spec = ImportSpec {
        key_columns: keys.to_vec(),
        ..Default::default()
    };
    for definition in definitions {
        let column = parse_column(definition, keys)?;
        spec.column_sizes.insert(column.name.clone(), column.size);
        spec.column_types.insert(column.name, column.ty);
    }
    Ok(spec)
}

/// Parse name=value field assignments against the schema
fn parse_fields(engine: &Engine, fields: &[String]) -> poldb::Result<HashMap<String, Value>> {
    let mut record = HashMap::with_capacity(fields.len());
    for field in fields {
        let (name, raw) = field.split_once('=').ok_or_else(|| {
            PoldbError::MalformedValue(format!("bad field assignment '{}'", field))
        })?;
        let (_, column) = engine.schema().column(name)?;
        record.insert(name.to_string(), parse_checked(column, raw)?);
    }
    Ok(record)
}

/// Parse a value for the named column
fn parse_typed(engine: &Engine, column: &str, raw: &str) -> poldb::Result<Value> {
    let (_, column) = engine.schema().column(column)?;
    parse_checked(column, raw)
}

/// Parse a value and reject text that exceeds the column width
///
/// The codec would truncate lossily; the CLI rejects instead.
fn parse_checked(column: &Column, raw: &str) -> poldb::Result<Value> {
    if column.ty == ColumnType::Text && raw.len() > column.size as usize {
        return Err(PoldbError::ValueTooLong {
            column: column.name.clone(),
            len: raw.len(),
            max: column.size,
        });
    }
    Value::parse(raw, column.ty)
}

/// Render rows as a simple aligned table
fn print_rows(engine: &Engine, rows: &[poldb::Row]) {
    if rows.is_empty() {
        return;
    }

    print!("{:>6}", "slot");
    for column in engine.schema().columns() {
        print!("  {}", column.name);
    }
    println!();

    for row in rows {
        print!("{:>6}", row.slot);
        for value in &row.values {
            print!("  {}", value);
        }
        println!();
    }
}
