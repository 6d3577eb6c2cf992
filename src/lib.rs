//! Read-only InnoDB tablespace decoder and B+Tree query engine.
//!
//! The `innodb-query` crate (library name `idbq`) parses pages straight out of
//! an InnoDB tablespace file (`.ibd`), rebuilds page headers, index structures,
//! records and overflow chains, and answers point, range and full-scan queries
//! against the clustered index without a running MySQL server.
//!
//! # Library API
//!
//! ```toml
//! [dependencies]
//! idbq = { package = "innodb-query", version = "0.1" }
//! ```
//!
//! ## Quick example
//!
//! ```no_run
//! use idbq::innodb::btree::TableReader;
//! use idbq::innodb::config::ReaderConfig;
//! use idbq::innodb::field_decode::FieldValue;
//! use idbq::innodb::schema::{ColumnDef, TableDef};
//!
//! let table = TableDef::new("t")
//!     .with_column(ColumnDef::parse("id", "int").unwrap())
//!     .with_column(ColumnDef::parse("name", "varchar(64)").unwrap().nullable())
//!     .with_primary_key(&["id"]);
//!
//! let mut reader = TableReader::open("t.ibd", table, ReaderConfig::default()).unwrap();
//!
//! if let Some(rec) = reader.query_by_primary_key(&[FieldValue::Int(42)]).unwrap() {
//!     println!("{:?}", rec.values);
//! }
//!
//! for rec in reader.range_query_iter(Some(&[FieldValue::Int(10)]), None).unwrap() {
//!     let rec = rec.unwrap();
//!     println!("{:?}", rec.key);
//! }
//! ```
//!
//! ## Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`TableReader`](innodb::btree::TableReader) | Point, range and full-scan queries over the clustered index |
//! | [`Tablespace`](innodb::tablespace::Tablespace) | Open `.ibd` files, load framed pages or header-only prologues |
//! | [`Page`](innodb::page::Page) | A framed page: validated FIL header/trailer plus body cursor |
//! | [`decode_page`](innodb::decode::decode_page) | Type-dispatched structural decode of any page |
//! | [`RecordReader`](innodb::record::RecordReader) | Compact-format record codec with overflow resolution |
//! | [`TableDef`](innodb::schema::TableDef) | Table definition consumed by the record codec |
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`innodb::cursor`] | Bounds-checked big-endian reader over one page buffer |
//! | [`innodb::page`] | FIL header/trailer framing and LSN consistency |
//! | [`innodb::tablespace`] | File I/O, page count, full and header-only page loads |
//! | [`innodb::fsp`] | FSP header and extent descriptor pages |
//! | [`innodb::inode`] | File segment inode pages |
//! | [`innodb::index`] | INDEX page header, FSEG headers, system records, directory |
//! | [`innodb::lob`] | Old-style BLOB overflow pages and external field pointers |
//! | [`innodb::record`] | Record header and body decoding |
//! | [`innodb::field_decode`] | Column value decoding from storage encodings |
//! | [`innodb::btree`] | B+Tree point lookup, traversal and range queries |
//! | [`innodb::iter`] | Lazy sibling-linked range iterator and record adapters |
//! | [`innodb::stats`] | Per-page and aggregate fill ratios |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | Builds the `inno-query` binary (clap + tracing-subscriber). |

#[cfg(feature = "cli")]
pub mod cli;
pub mod innodb;

use thiserror::Error;

/// Errors returned by `idbq` operations.
#[derive(Error, Debug)]
pub enum IdbError {
    /// An I/O error occurred (file open, read, seek, or write failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// A parse error occurred (malformed schema text, config, or unexpected values).
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid argument was supplied (bad range bounds, unknown column, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// A read ran past the end of a page buffer.
    #[error("Read of {len} bytes at offset {offset} exceeds buffer of {size} bytes")]
    Bounds {
        /// Position the read started at.
        offset: usize,
        /// Number of bytes requested.
        len: usize,
        /// Size of the underlying buffer.
        size: usize,
    },

    /// A page failed a structural integrity check.
    #[error("Corrupt page {page}: {reason}")]
    CorruptPage {
        /// Page number the failure was detected on.
        page: u32,
        /// What was wrong with it.
        reason: String,
    },

    /// The data uses a storage format this reader does not decode.
    #[error("Unsupported format: {0}")]
    Unsupported(String),
}

impl IdbError {
    /// Shorthand for building a [`IdbError::CorruptPage`].
    pub(crate) fn corrupt(page: u32, reason: impl Into<String>) -> Self {
        IdbError::CorruptPage {
            page,
            reason: reason.into(),
        }
    }
}
