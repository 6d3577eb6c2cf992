use std::io::Write;

use tracing::debug;

use crate::cli::{open_reader, parse_columns, parse_key, write_record};
use crate::innodb::config::ReaderConfig;
use crate::innodb::field_decode::FieldValue;
use crate::innodb::iter::RecordIterExt;
use crate::innodb::record::Record;
use crate::IdbError;

pub struct GetOptions {
    pub file: String,
    pub schema: String,
    pub key: String,
}

pub struct ScanOptions {
    pub file: String,
    pub schema: String,
    pub filters: Vec<String>,
    pub columns: Option<String>,
}

pub struct RangeOptions {
    pub file: String,
    pub schema: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub columns: Option<String>,
}

/// Point lookup; prints nothing when the key is absent.
pub fn execute_get(
    opts: &GetOptions,
    config: &ReaderConfig,
    writer: &mut dyn Write,
) -> Result<(), IdbError> {
    let mut reader = open_reader(&opts.file, &opts.schema, config)?;
    let key = parse_key(&opts.key, reader.table())?;
    match reader.query_by_primary_key(&key)? {
        Some(rec) => write_record(writer, reader.table(), &rec, None),
        None => {
            debug!(key = %opts.key, "key not found");
            Ok(())
        }
    }
}

pub fn execute_scan(
    opts: &ScanOptions,
    config: &ReaderConfig,
    writer: &mut dyn Write,
) -> Result<(), IdbError> {
    let mut reader = open_reader(&opts.file, &opts.schema, config)?;
    let table = reader.table().clone();

    let filters: Vec<(usize, FieldValue)> = opts
        .filters
        .iter()
        .map(|f| {
            let (name, value) = f.split_once('=').ok_or_else(|| {
                IdbError::Argument(format!("filter '{}' is not COLUMN=VALUE", f))
            })?;
            let idx = table
                .column_index(name.trim())
                .ok_or_else(|| IdbError::Argument(format!("unknown column '{}'", name)))?;
            Ok((idx, FieldValue::parse_literal(value, &table.columns[idx])?))
        })
        .collect::<Result<_, IdbError>>()?;
    let columns = opts
        .columns
        .as_deref()
        .map(|c| parse_columns(c, &table))
        .transpose()?;

    let matches = |rec: &Record| {
        filters.iter().all(|(idx, want)| {
            rec.value(*idx)
                .is_some_and(|v| v.compare(want) == std::cmp::Ordering::Equal)
        })
    };
    let rows = reader.query_all_with(matches, columns.as_deref())?;
    for rec in &rows {
        write_record(writer, &table, rec, columns.as_deref())?;
    }
    Ok(())
}

pub fn execute_range(
    opts: &RangeOptions,
    config: &ReaderConfig,
    writer: &mut dyn Write,
) -> Result<(), IdbError> {
    let mut reader = open_reader(&opts.file, &opts.schema, config)?;
    let table = reader.table().clone();
    let lower = opts.from.as_deref().map(|k| parse_key(k, &table)).transpose()?;
    let upper = opts.to.as_deref().map(|k| parse_key(k, &table)).transpose()?;
    let columns = opts
        .columns
        .as_deref()
        .map(|c| parse_columns(c, &table))
        .transpose()?;

    let rows = reader
        .range_query_iter(lower.as_deref(), upper.as_deref())?
        .map_records(|rec| match &columns {
            Some(cols) => rec.project(cols),
            None => Ok(rec),
        });
    for rec in rows {
        write_record(writer, &table, &rec?, columns.as_deref())?;
    }
    Ok(())
}
