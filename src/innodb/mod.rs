//! InnoDB binary format parsing and clustered-index queries.
//!
//! The modules build on each other bottom-up: [`cursor`] reads typed values
//! from a page buffer, [`page`] frames pages, [`tablespace`] loads them from
//! a file, the page decoders ([`fsp`], [`inode`], [`index`], [`lob`],
//! dispatched by [`decode`]) give them structure, [`record`] decodes rows
//! against a [`schema::TableDef`], and [`btree`] answers queries.
//!
//! Start with [`btree::TableReader`] to query a table, or with
//! [`tablespace::Tablespace`] to inspect individual pages.

pub mod btree;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod cursor;
pub mod decode;
pub mod field_decode;
pub mod fsp;
pub mod index;
pub mod inode;
pub mod iter;
pub mod lob;
pub mod page;
pub mod page_types;
pub mod record;
pub mod schema;
pub mod stats;
pub mod tablespace;
