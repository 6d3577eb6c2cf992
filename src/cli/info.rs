use std::io::Write;

use serde::Serialize;

use crate::cli::{open_reader, wprintln};
use crate::innodb::config::ReaderConfig;
use crate::innodb::stats::FillStats;
use crate::IdbError;

pub struct InfoOptions {
    pub file: String,
    pub schema: String,
}

#[derive(Serialize)]
struct InfoJson {
    file: String,
    table: String,
    pages: u64,
    root_page: u32,
    index_id: u64,
    root_level: u16,
    fill: FillStats,
}

pub fn execute(
    opts: &InfoOptions,
    config: &ReaderConfig,
    writer: &mut dyn Write,
) -> Result<(), IdbError> {
    let mut reader = open_reader(&opts.file, &opts.schema, config)?;
    let root = reader.root_page();
    let root_level = reader.page_fill(root)?.level;
    let info = InfoJson {
        file: opts.file.clone(),
        table: reader.table().name.clone(),
        pages: reader.num_of_pages(),
        root_page: root,
        index_id: reader.index_id(),
        root_level,
        fill: reader.fill_stats()?,
    };

    let json = serde_json::to_string_pretty(&info)
        .map_err(|e| IdbError::Parse(format!("JSON serialization error: {}", e)))?;
    wprintln!(writer, "{}", json)
}
