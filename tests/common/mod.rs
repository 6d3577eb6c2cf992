//! Synthetic tablespace builder shared by the integration tests and benches.
//!
//! Lays out a small but structurally faithful `.ibd` image: FSP header,
//! insert buffer bitmap and inode pages, optional SDI pages, a clustered
//! index B+Tree starting right after them, and BLOB pages for externally
//! stored columns. Records are encoded in compact format using the same
//! [`RecordLayout`] the reader derives from the table definition.

#![allow(dead_code)]

use byteorder::{BigEndian, ByteOrder};
use std::io::Write;
use tempfile::NamedTempFile;

use idbq::innodb::btree::TableReader;
use idbq::innodb::config::ReaderConfig;
use idbq::innodb::constants::*;
use idbq::innodb::schema::{ColumnDef, FieldLayout, FieldSource, RecordLayout, TableDef};
use idbq::innodb::tablespace::Tablespace;

pub const PS: usize = SIZE_PAGE;
pub const INDEX_ID: u64 = 42;
pub const SPACE_ID: u32 = 7;
pub const LSN: u64 = 0x1_0000_2000;

/// Stored form of a signed INT.
pub fn int4(v: i32) -> Vec<u8> {
    ((v as u32) ^ 0x8000_0000).to_be_bytes().to_vec()
}

/// Stored form of a signed BIGINT.
pub fn int8(v: i64) -> Vec<u8> {
    ((v as u64) ^ (1 << 63)).to_be_bytes().to_vec()
}

/// One stored field value.
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Data(Vec<u8>),
    /// Stored with `inline` bytes in the record and the rest on BLOB pages.
    External { data: Vec<u8>, inline: usize },
}

impl Cell {
    pub fn text(s: &str) -> Cell {
        Cell::Data(s.as_bytes().to_vec())
    }
}

/// One clustered index row, cells in table column order.
#[derive(Debug, Clone)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub row_id: u64,
    pub deleted: bool,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row {
            cells,
            row_id: 0,
            deleted: false,
        }
    }

    pub fn with_row_id(mut self, row_id: u64) -> Self {
        self.row_id = row_id;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

struct Encoded {
    extra: Vec<u8>,
    body: Vec<u8>,
    deleted: bool,
}

/// Builds tablespace images holding one clustered index.
pub struct TreeBuilder {
    table: TableDef,
    layout: RecordLayout,
    /// Records per leaf page.
    pub leaf_capacity: usize,
    /// Node pointers per internal page.
    pub fanout: usize,
    /// Payload bytes per BLOB page.
    pub blob_part: usize,
    /// SDI pages placed before the root.
    pub sdi_pages: u32,
    /// Added to every page's declared record count.
    pub n_recs_skew: i32,
}

impl TreeBuilder {
    pub fn new(table: TableDef) -> Self {
        let layout = RecordLayout::new(&table).expect("valid table");
        TreeBuilder {
            table,
            layout,
            leaf_capacity: 4,
            fanout: 3,
            blob_part: 1500,
            sdi_pages: 0,
            n_recs_skew: 0,
        }
    }

    pub fn leaf_capacity(mut self, n: usize) -> Self {
        self.leaf_capacity = n;
        self
    }

    pub fn fanout(mut self, n: usize) -> Self {
        self.fanout = n;
        self
    }

    pub fn sdi_pages(mut self, n: u32) -> Self {
        self.sdi_pages = n;
        self
    }

    pub fn n_recs_skew(mut self, n: i32) -> Self {
        self.n_recs_skew = n;
        self
    }

    /// First page of the B+Tree; the root.
    pub fn root_page(&self) -> u32 {
        FIRST_ROOT_PAGE + self.sdi_pages
    }

    /// Build the image for `rows`, which must be in ascending key order.
    pub fn build(&self, rows: &[Row]) -> Vec<u8> {
        let leaf_groups: Vec<&[Row]> = if rows.is_empty() {
            vec![rows]
        } else {
            rows.chunks(self.leaf_capacity).collect()
        };

        let mut level_sizes = vec![leaf_groups.len()];
        while *level_sizes.last().unwrap() > 1 {
            let below = *level_sizes.last().unwrap();
            level_sizes.push(below.div_ceil(self.fanout));
        }
        let height = level_sizes.len();

        // Root first, leaves last
        let mut first_page = vec![0u32; height];
        let mut next = self.root_page();
        for level in (0..height).rev() {
            first_page[level] = next;
            next += level_sizes[level] as u32;
        }
        let mut next_blob = next;
        let mut blob_pages: Vec<(u32, Vec<u8>)> = Vec::new();
        let mut tree_pages: Vec<(u32, Vec<u8>)> = Vec::new();

        // Leaves
        let mut child_keys: Vec<Vec<Cell>> = Vec::new();
        for (i, group) in leaf_groups.iter().enumerate() {
            let recs: Vec<Encoded> = group
                .iter()
                .map(|row| {
                    let key = self.key_cells(row);
                    self.encode(&key, Some(row), None, &mut next_blob, &mut blob_pages)
                })
                .collect();
            if let Some(first) = group.first() {
                child_keys.push(self.key_cells(first));
            }
            let page_no = first_page[0] + i as u32;
            let prev = (i > 0).then(|| page_no - 1);
            let next = (i + 1 < leaf_groups.len()).then(|| page_no + 1);
            tree_pages.push((page_no, self.index_page(page_no, 0, prev, next, recs)));
        }

        // Internal levels
        for level in 1..height {
            let mut keys_above = Vec::new();
            let children: Vec<(u32, Vec<Cell>)> = child_keys
                .iter()
                .enumerate()
                .map(|(i, k)| (first_page[level - 1] + i as u32, k.clone()))
                .collect();
            let groups: Vec<_> = children.chunks(self.fanout).collect();
            for (i, group) in groups.iter().enumerate() {
                let recs = group
                    .iter()
                    .map(|(child, key)| {
                        self.encode(key, None, Some(*child), &mut next_blob, &mut blob_pages)
                    })
                    .collect();
                keys_above.push(group[0].1.clone());
                let page_no = first_page[level] + i as u32;
                let prev = (i > 0).then(|| page_no - 1);
                let next = (i + 1 < groups.len()).then(|| page_no + 1);
                tree_pages.push((
                    page_no,
                    self.index_page(page_no, level as u16, prev, next, recs),
                ));
            }
            child_keys = keys_above;
        }

        let total = next_blob as usize;
        let mut image = vec![0u8; total * PS];
        let mut put = |page_no: u32, page: Vec<u8>| {
            image[page_no as usize * PS..(page_no as usize + 1) * PS].copy_from_slice(&page);
        };
        put(0, fsp_hdr_page(total as u32));
        put(1, frame(vec![0u8; PS], 1, 5, None, None));
        put(2, frame(vec![0u8; PS], 2, 3, None, None));
        for n in 0..self.sdi_pages {
            put(FIRST_ROOT_PAGE + n, frame(vec![0u8; PS], FIRST_ROOT_PAGE + n, 17853, None, None));
        }
        for (page_no, page) in tree_pages.into_iter().chain(blob_pages) {
            put(page_no, page);
        }
        image
    }

    fn key_cells(&self, row: &Row) -> Vec<Cell> {
        self.layout
            .key_fields
            .iter()
            .map(|f| match f.source {
                FieldSource::Column(i) => row.cells[i].clone(),
                FieldSource::RowId => Cell::Data(row.row_id.to_be_bytes()[2..].to_vec()),
            })
            .collect()
    }

    fn encode(
        &self,
        key: &[Cell],
        row: Option<&Row>,
        child: Option<u32>,
        next_blob: &mut u32,
        blob_pages: &mut Vec<(u32, Vec<u8>)>,
    ) -> Encoded {
        let mut nulls = vec![0u8; self.layout.null_bitmap_len()];
        let mut lens = Vec::new();
        let mut body = Vec::new();

        let mut store = |field: &FieldLayout, cell: &Cell, body: &mut Vec<u8>| {
            let (bytes, external) = match cell {
                Cell::Null => {
                    let bit = field.null_bit.expect("NULL in a NOT NULL field");
                    nulls[bit / 8] |= 1 << (bit % 8);
                    return;
                }
                Cell::Data(d) => (d.clone(), false),
                Cell::External { data, inline } => {
                    let rest = &data[*inline..];
                    let first = *next_blob;
                    let parts: Vec<&[u8]> = rest.chunks(self.blob_part).collect();
                    for (i, part) in parts.iter().enumerate() {
                        let page_no = *next_blob;
                        *next_blob += 1;
                        let next = (i + 1 < parts.len()).then_some(page_no + 1);
                        blob_pages.push((page_no, blob_page(page_no, part, next)));
                    }
                    let mut stored = data[..*inline].to_vec();
                    let mut ptr = [0u8; BTR_EXTERN_FIELD_REF_SIZE];
                    BigEndian::write_u32(&mut ptr[BTR_EXTERN_SPACE_ID..], SPACE_ID);
                    BigEndian::write_u32(&mut ptr[BTR_EXTERN_PAGE_NO..], first);
                    BigEndian::write_u32(&mut ptr[BTR_EXTERN_OFFSET..], FIL_PAGE_DATA as u32);
                    BigEndian::write_u32(&mut ptr[BTR_EXTERN_LEN + 4..], rest.len() as u32);
                    stored.extend_from_slice(&ptr);
                    (stored, true)
                }
            };
            if field.fixed_len.is_none() {
                let len = bytes.len();
                if field.is_big && (len >= 128 || external) {
                    let ext_flag = if external { 0x40 } else { 0 };
                    lens.push(0x80 | ext_flag | (len >> 8) as u8);
                    lens.push(len as u8);
                } else {
                    lens.push(len as u8);
                }
            }
            body.extend_from_slice(&bytes);
        };

        for (field, cell) in self.layout.key_fields.iter().zip(key) {
            store(field, cell, &mut body);
        }
        match (row, child) {
            (Some(row), _) => {
                body.extend_from_slice(&[0, 0, 0, 0, 0x10, 0x01]); // DB_TRX_ID
                body.extend_from_slice(&[0x80, 0, 0, 0, 0, 0, 0x01]); // DB_ROLL_PTR
                for field in &self.layout.value_fields {
                    if let FieldSource::Column(i) = field.source {
                        store(field, &row.cells[i], &mut body);
                    }
                }
            }
            (None, Some(child)) => body.extend_from_slice(&child.to_be_bytes()),
            (None, None) => unreachable!(),
        }

        // Both lists are read toward lower addresses
        let mut extra: Vec<u8> = lens.into_iter().rev().collect();
        extra.extend(nulls.into_iter().rev());
        Encoded {
            extra,
            body,
            deleted: row.is_some_and(|r| r.deleted),
        }
    }

    fn index_page(
        &self,
        page_no: u32,
        level: u16,
        prev: Option<u32>,
        next: Option<u32>,
        recs: Vec<Encoded>,
    ) -> Vec<u8> {
        let mut buf = vec![0u8; PS];
        buf[PAGE_NEW_INFIMUM..PAGE_NEW_INFIMUM + 8].copy_from_slice(INFIMUM_LITERAL);
        buf[PAGE_NEW_SUPREMUM..PAGE_NEW_SUPREMUM_END].copy_from_slice(SUPREMUM_LITERAL);

        let mut heap = PAGE_NEW_SUPREMUM_END;
        let mut origins = Vec::with_capacity(recs.len());
        for rec in &recs {
            buf[heap..heap + rec.extra.len()].copy_from_slice(&rec.extra);
            let origin = heap + rec.extra.len() + REC_N_NEW_EXTRA_BYTES;
            buf[origin..origin + rec.body.len()].copy_from_slice(&rec.body);
            origins.push(origin);
            heap = origin + rec.body.len();
        }

        // Slots: infimum alone, groups of four, the last group owned by the supremum
        let mut owners = vec![(PAGE_NEW_INFIMUM, 1u8)];
        let groups: Vec<&[usize]> = origins.chunks(4).collect();
        for (g, group) in groups.iter().enumerate() {
            if g + 1 < groups.len() {
                owners.push((*group.last().unwrap(), group.len() as u8));
            }
        }
        let sup_owned = groups.last().map_or(0, |g| g.len()) as u8 + 1;
        owners.push((PAGE_NEW_SUPREMUM, sup_owned));
        let owned = |origin: usize| owners.iter().find(|(o, _)| *o == origin).map_or(0, |o| o.1);

        let status = if level == 0 { 0 } else { 1 };
        write_rec_header(&mut buf, PAGE_NEW_INFIMUM, 1, 0, 2, origins.first().copied().unwrap_or(PAGE_NEW_SUPREMUM));
        for (i, &origin) in origins.iter().enumerate() {
            let mut flags = owned(origin);
            if recs[i].deleted {
                flags |= 0x20;
            }
            if level > 0 && i == 0 && prev.is_none() {
                flags |= 0x10;
            }
            let next_origin = origins.get(i + 1).copied().unwrap_or(PAGE_NEW_SUPREMUM);
            write_rec_header(&mut buf, origin, flags, 2 + i as u16, status, next_origin);
        }
        write_rec_header(&mut buf, PAGE_NEW_SUPREMUM, sup_owned, 1, 3, PAGE_NEW_SUPREMUM);

        let dir_end = PS - SIZE_FIL_TRAILER;
        for (k, (origin, _)) in owners.iter().enumerate() {
            BigEndian::write_u16(&mut buf[dir_end - 2 * (k + 1)..], *origin as u16);
        }
        assert!(heap <= dir_end - 2 * owners.len(), "page {} overflows", page_no);

        let ph = FIL_PAGE_DATA;
        BigEndian::write_u16(&mut buf[ph + PAGE_N_DIR_SLOTS..], owners.len() as u16);
        BigEndian::write_u16(&mut buf[ph + PAGE_HEAP_TOP..], heap as u16);
        BigEndian::write_u16(&mut buf[ph + PAGE_N_HEAP..], 0x8000 | (2 + recs.len() as u16));
        BigEndian::write_u16(&mut buf[ph + PAGE_DIRECTION..], PAGE_RIGHT);
        let declared = (recs.len() as i32 + self.n_recs_skew).max(0) as u16;
        BigEndian::write_u16(&mut buf[ph + PAGE_N_RECS..], declared);
        BigEndian::write_u16(&mut buf[ph + PAGE_LEVEL..], level);
        BigEndian::write_u64(&mut buf[ph + PAGE_INDEX_ID..], INDEX_ID);
        // Leaf and internal segment headers point at the inode page
        let seg = ph + INDEX_HEADER_SIZE;
        BigEndian::write_u32(&mut buf[seg..], SPACE_ID);
        BigEndian::write_u32(&mut buf[seg + 4..], 2);
        BigEndian::write_u16(&mut buf[seg + 8..], (FSEG_ARR_OFFSET + FSEG_INODE_SIZE) as u16);
        BigEndian::write_u32(&mut buf[seg + 10..], SPACE_ID);
        BigEndian::write_u32(&mut buf[seg + 14..], 2);
        BigEndian::write_u16(&mut buf[seg + 18..], FSEG_ARR_OFFSET as u16);

        frame(buf, page_no, 17855, prev, next)
    }
}

fn write_rec_header(buf: &mut [u8], origin: usize, flags: u8, heap_no: u16, status: u16, next: usize) {
    buf[origin - 5] = flags;
    BigEndian::write_u16(&mut buf[origin - 4..], (heap_no << 3) | status);
    BigEndian::write_i16(&mut buf[origin - 2..], (next as isize - origin as isize) as i16);
}

fn blob_page(page_no: u32, part: &[u8], next: Option<u32>) -> Vec<u8> {
    let mut buf = vec![0u8; PS];
    BigEndian::write_u32(&mut buf[FIL_PAGE_DATA + LOB_HDR_PART_LEN..], part.len() as u32);
    BigEndian::write_u32(
        &mut buf[FIL_PAGE_DATA + LOB_HDR_NEXT_PAGE_NO..],
        next.unwrap_or(FIL_NULL),
    );
    let start = FIL_PAGE_DATA + LOB_HDR_SIZE;
    buf[start..start + part.len()].copy_from_slice(part);
    frame(buf, page_no, 10, None, None)
}

fn fsp_hdr_page(total_pages: u32) -> Vec<u8> {
    let mut buf = vec![0u8; PS];
    let fsp = FIL_PAGE_DATA;
    BigEndian::write_u32(&mut buf[fsp + FSP_SPACE_ID..], SPACE_ID);
    BigEndian::write_u32(&mut buf[fsp + FSP_SIZE..], total_pages);
    BigEndian::write_u32(&mut buf[fsp + FSP_FREE_LIMIT..], total_pages);
    BigEndian::write_u32(&mut buf[fsp + FSP_FRAG_N_USED..], total_pages);
    frame(buf, 0, 8, None, None)
}

/// Fill in the FIL header and trailer, then the CRC-32C checksum.
pub fn frame(mut buf: Vec<u8>, page_no: u32, page_type: u16, prev: Option<u32>, next: Option<u32>) -> Vec<u8> {
    BigEndian::write_u32(&mut buf[FIL_PAGE_OFFSET..], page_no);
    BigEndian::write_u32(&mut buf[FIL_PAGE_PREV..], prev.unwrap_or(FIL_NULL));
    BigEndian::write_u32(&mut buf[FIL_PAGE_NEXT..], next.unwrap_or(FIL_NULL));
    BigEndian::write_u64(&mut buf[FIL_PAGE_LSN..], LSN);
    BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], page_type);
    BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_ID..], SPACE_ID);
    BigEndian::write_u32(&mut buf[PS - 4..], LSN as u32);

    let end = PS - SIZE_FIL_TRAILER;
    let crc = crc32c::crc32c(&buf[FIL_PAGE_OFFSET..FIL_PAGE_FILE_FLUSH_LSN])
        ^ crc32c::crc32c(&buf[FIL_PAGE_DATA..end]);
    BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_OR_CHKSUM..], crc);
    buf
}

pub fn write_temp(image: &[u8]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("create temp file");
    tmp.write_all(image).expect("write image");
    tmp.flush().expect("flush image");
    tmp
}

pub fn reader(image: Vec<u8>, table: TableDef, config: ReaderConfig) -> TableReader {
    let ts = Tablespace::from_bytes(image, &config).expect("tablespace");
    TableReader::from_tablespace(ts, table, config).expect("table reader")
}

/// `(id int PK, a bigint, b varchar(64), c varchar(1024))`
pub fn scenario_table() -> TableDef {
    TableDef::new("scenario")
        .with_column(ColumnDef::parse("id", "int").unwrap())
        .with_column(ColumnDef::parse("a", "bigint").unwrap())
        .with_column(ColumnDef::parse("b", "varchar(64)").unwrap())
        .with_column(ColumnDef::parse("c", "varchar(1024)").unwrap())
        .with_primary_key(&["id"])
}

pub fn b_value(i: i32) -> String {
    let ch = (b'a' + (i % 26) as u8) as char;
    ch.to_string().repeat(i as usize % 64 + 1)
}

pub fn c_value(i: i32) -> String {
    let ch = (b'A' + (i % 26) as u8) as char;
    ch.to_string().repeat(10 * (i as usize % 100 + 1))
}

pub fn scenario_row(i: i32) -> Row {
    Row::new(vec![
        Cell::Data(int4(i)),
        Cell::Data(int8(i as i64 * 2)),
        Cell::text(&b_value(i)),
        Cell::text(&c_value(i)),
    ])
}

pub fn scenario_rows(ids: impl IntoIterator<Item = i32>) -> Vec<Row> {
    ids.into_iter().map(scenario_row).collect()
}
