use std::io::Write;

use serde::Serialize;

use crate::cli::wprintln;
use crate::innodb::config::ReaderConfig;
use crate::innodb::decode::{decode_page, PageBody};
use crate::innodb::page::FilHeader;
use crate::innodb::tablespace::Tablespace;
use crate::IdbError;

pub struct PageOptions {
    pub file: String,
    pub page: u32,
}

#[derive(Serialize)]
struct PageJson {
    page_number: u32,
    page_type: String,
    header: FilHeader,
    decoded: PageBody,
}

pub fn execute(
    opts: &PageOptions,
    config: &ReaderConfig,
    writer: &mut dyn Write,
) -> Result<(), IdbError> {
    let mut ts = Tablespace::open(&opts.file, config)?;
    let page = ts.load_page(opts.page)?;
    let out = PageJson {
        page_number: page.number(),
        page_type: page.page_type().name().to_string(),
        header: page.header().clone(),
        decoded: decode_page(&page)?,
    };

    let json = serde_json::to_string_pretty(&out)
        .map_err(|e| IdbError::Parse(format!("JSON serialization error: {}", e)))?;
    wprintln!(writer, "{}", json)
}
