#![cfg(feature = "cli")]
//! CLI subcommands run against a synthetic tablespace.

mod common;

use std::io::Write;

use common::*;
use idbq::cli::info::{self, InfoOptions};
use idbq::cli::page::{self, PageOptions};
use idbq::cli::query::{execute_get, execute_range, execute_scan, GetOptions, RangeOptions, ScanOptions};
use idbq::innodb::config::ReaderConfig;
use idbq::IdbError;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

const SCHEMA: &str = r#"{
    "name": "scenario",
    "columns": [
        {"name": "id", "type": "int"},
        {"name": "a", "type": "bigint"},
        {"name": "b", "type": "varchar(64)"},
        {"name": "c", "type": "varchar(1024)"}
    ],
    "primary_key": ["id"]
}"#;

struct Fixture {
    ibd: NamedTempFile,
    schema: NamedTempFile,
}

impl Fixture {
    fn new() -> Self {
        let image = TreeBuilder::new(scenario_table()).build(&scenario_rows(1..=10));
        let mut schema = NamedTempFile::new().unwrap();
        schema.write_all(SCHEMA.as_bytes()).unwrap();
        Fixture {
            ibd: write_temp(&image),
            schema,
        }
    }

    fn file(&self) -> String {
        self.ibd.path().display().to_string()
    }

    fn schema(&self) -> String {
        self.schema.path().display().to_string()
    }
}

fn lines(out: Vec<u8>) -> Vec<Value> {
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn test_get_prints_row() {
    let fx = Fixture::new();
    let mut out = Vec::new();
    let opts = GetOptions {
        file: fx.file(),
        schema: fx.schema(),
        key: "7".to_string(),
    };
    execute_get(&opts, &ReaderConfig::default(), &mut out).unwrap();
    assert_eq!(
        lines(out),
        vec![json!({"id": 7, "a": 14, "b": b_value(7), "c": c_value(7)})]
    );

    let mut out = Vec::new();
    let missing = GetOptions {
        key: "70".to_string(),
        ..opts
    };
    execute_get(&missing, &ReaderConfig::default(), &mut out).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_scan_filters_and_projects() {
    let fx = Fixture::new();
    let mut out = Vec::new();
    let opts = ScanOptions {
        file: fx.file(),
        schema: fx.schema(),
        filters: vec!["a=14".to_string()],
        columns: Some("b,id".to_string()),
    };
    execute_scan(&opts, &ReaderConfig::default(), &mut out).unwrap();
    assert_eq!(lines(out), vec![json!({"b": b_value(7), "id": 7})]);

    let bad = ScanOptions {
        filters: vec!["nope".to_string()],
        ..opts
    };
    assert!(matches!(
        execute_scan(&bad, &ReaderConfig::default(), &mut Vec::new()),
        Err(IdbError::Argument(_))
    ));
}

#[test]
fn test_range_prints_rows_in_key_order() {
    let fx = Fixture::new();
    let mut out = Vec::new();
    let opts = RangeOptions {
        file: fx.file(),
        schema: fx.schema(),
        from: Some("5".to_string()),
        to: None,
        columns: Some("id".to_string()),
    };
    execute_range(&opts, &ReaderConfig::default(), &mut out).unwrap();
    let ids: Vec<Value> = (5..=10).map(|i| json!({ "id": i })).collect();
    assert_eq!(lines(out), ids);

    let reversed = RangeOptions {
        from: Some("9".to_string()),
        to: Some("2".to_string()),
        ..opts
    };
    assert!(matches!(
        execute_range(&reversed, &ReaderConfig::default(), &mut Vec::new()),
        Err(IdbError::Argument(_))
    ));
}

#[test]
fn test_info_summarizes_index() {
    let fx = Fixture::new();
    let mut out = Vec::new();
    let opts = InfoOptions {
        file: fx.file(),
        schema: fx.schema(),
    };
    info::execute(&opts, &ReaderConfig::default(), &mut out).unwrap();

    let v: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["table"], "scenario");
    assert_eq!(v["pages"], 7);
    assert_eq!(v["root_page"], 3);
    assert_eq!(v["index_id"], INDEX_ID);
    assert_eq!(v["root_level"], 1);
    assert_eq!(v["fill"]["leaf_pages"], 3);
}

#[test]
fn test_page_decodes_structure() {
    let fx = Fixture::new();
    let mut out = Vec::new();
    let opts = PageOptions {
        file: fx.file(),
        page: 4,
    };
    page::execute(&opts, &ReaderConfig::default(), &mut out).unwrap();

    let v: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["page_number"], 4);
    assert_eq!(v["decoded"]["kind"], "Index");
    assert_eq!(v["decoded"]["body"]["header"]["n_recs"], 4);
    assert_eq!(v["decoded"]["body"]["next_page"], 5);
}
