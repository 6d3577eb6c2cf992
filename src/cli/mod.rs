//! CLI subcommand implementations for the `inno-query` binary.
//!
//! Argument parsing uses clap derive macros, with the top-level [`app::Cli`]
//! struct and [`app::Commands`] enum defined in [`app`] and shared between
//! `main.rs` and `build.rs` (for man page generation) via `include!()`.
//!
//! Each subcommand module follows the same pattern: an `Options` struct holding
//! the parsed arguments and a `pub fn execute(opts, writer) -> Result<(), IdbError>`
//! entry point. The `writer: &mut dyn Write` parameter allows output to be
//! captured in tests.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `inno-query info` | [`info`] | Page count, root page and clustered index fill |
//! | `inno-query page` | [`page`] | Structural decode of one page |
//! | `inno-query get` | [`query`] | Point lookup by primary key |
//! | `inno-query scan` | [`query`] | Full scan with equality filters and projection |
//! | `inno-query range` | [`query`] | Primary key range scan |
//!
//! Every command prints JSON; row commands print one JSON object per line,
//! keyed by column name.

pub mod app;
pub mod info;
pub mod page;
pub mod query;

use std::io::Write;

use serde_json::{Map, Value};

use crate::innodb::btree::TableReader;
use crate::innodb::config::ReaderConfig;
use crate::innodb::field_decode::FieldValue;
use crate::innodb::record::Record;
use crate::innodb::schema::TableDef;
use crate::IdbError;

/// Write a line to the given writer, converting io::Error to IdbError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::IdbError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::IdbError::Io(e.to_string()))
    };
}

pub(crate) use wprintln;

/// Load the reader config from `path`, or the defaults.
pub fn load_config(path: Option<&str>) -> Result<ReaderConfig, IdbError> {
    match path {
        Some(p) => ReaderConfig::load(p),
        None => Ok(ReaderConfig::default()),
    }
}

/// Open `file` as the table described by the schema file.
pub(crate) fn open_reader(
    file: &str,
    schema: &str,
    config: &ReaderConfig,
) -> Result<TableReader, IdbError> {
    let table = TableDef::load(schema)?;
    TableReader::open(file, table, config.clone())
}

/// Parse comma separated key values against the table's key columns.
///
/// Tables without a primary key are keyed by the hidden row id.
pub(crate) fn parse_key(text: &str, table: &TableDef) -> Result<Vec<FieldValue>, IdbError> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if table.primary_key.is_empty() {
        return match parts.as_slice() {
            [id] => id
                .parse()
                .map(|v| vec![FieldValue::Uint(v)])
                .map_err(|_| IdbError::Argument(format!("'{}' is not a row id", id))),
            _ => Err(IdbError::Argument(
                "table has no primary key; give a single row id".to_string(),
            )),
        };
    }
    if parts.len() > table.primary_key.len() {
        return Err(IdbError::Argument(format!(
            "key has {} values, primary key has {} columns",
            parts.len(),
            table.primary_key.len()
        )));
    }
    parts
        .iter()
        .zip(&table.primary_key)
        .map(|(value, name)| {
            let idx = table
                .column_index(name)
                .ok_or_else(|| IdbError::Argument(format!("unknown column '{}'", name)))?;
            FieldValue::parse_literal(value, &table.columns[idx])
        })
        .collect()
}

/// Resolve comma separated column names to indices.
pub(crate) fn parse_columns(text: &str, table: &TableDef) -> Result<Vec<usize>, IdbError> {
    text.split(',')
        .map(str::trim)
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| IdbError::Argument(format!("unknown column '{}'", name)))
        })
        .collect()
}

/// Print a record as one JSON object. `columns` names the indices the
/// record's values were projected onto, if any.
pub(crate) fn write_record(
    writer: &mut dyn Write,
    table: &TableDef,
    rec: &Record,
    columns: Option<&[usize]>,
) -> Result<(), IdbError> {
    let names: Vec<&str> = match columns {
        Some(cols) => cols.iter().map(|&i| table.columns[i].name.as_str()).collect(),
        None => table.columns.iter().map(|c| c.name.as_str()).collect(),
    };

    let mut row = Map::new();
    if table.primary_key.is_empty() {
        if let Some(id) = rec.key.first() {
            row.insert("DB_ROW_ID".to_string(), to_value(id)?);
        }
    }
    for (name, value) in names.iter().zip(&rec.values) {
        row.insert(name.to_string(), to_value(value)?);
    }
    let line = serde_json::to_string(&Value::Object(row))
        .map_err(|e| IdbError::Parse(format!("JSON serialization error: {}", e)))?;
    wprintln!(writer, "{}", line)
}

fn to_value(v: &FieldValue) -> Result<Value, IdbError> {
    serde_json::to_value(v).map_err(|e| IdbError::Parse(format!("JSON serialization error: {}", e)))
}
