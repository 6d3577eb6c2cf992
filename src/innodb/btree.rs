//! Queries over a table's clustered index.
//!
//! [`TableReader`] owns an open [`Tablespace`] and a [`RecordReader`] for the
//! table and answers point lookups, full scans and primary-key range scans by
//! walking the B+Tree from its root page. Nothing is cached between calls:
//! every query reads the pages it needs.
//!
//! Within a page, the search binary-searches the directory slots on the key
//! of each slot's owner record, then scans the record chain forward starting
//! one slot before the convergence point. Pages are linked by number only;
//! children and siblings are loaded on demand.

use std::cmp::Ordering;

use tracing::{debug, trace, warn};

use crate::innodb::config::ReaderConfig;
use crate::innodb::constants::*;
use crate::innodb::decode::{decode_page, PageBody};
use crate::innodb::field_decode::{compare_keys, FieldValue};
use crate::innodb::index::IndexPage;
use crate::innodb::iter::RangeIter;
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::innodb::record::{DecodeMode, Record, RecordReader};
use crate::innodb::schema::TableDef;
use crate::innodb::stats::{FillStats, PageFill};
use crate::innodb::tablespace::Tablespace;
use crate::IdbError;

/// How a page search treats records whose key equals the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    /// Stop at an equal record.
    Exact,
    /// Treat equal records as greater, positioning before the first of them.
    /// Used for key prefixes, which may match several records.
    LowerBound,
}

/// Where a search key falls on one page.
#[derive(Debug)]
enum Located {
    Match(Record),
    /// `prev` is the last record below the key (possibly the infimum),
    /// `next` the first record above it (possibly the supremum).
    Between { prev: Record, next: Record },
}

impl Located {
    /// The node pointer to descend through on an internal page.
    ///
    /// A key below every node pointer goes to the leftmost child.
    fn child_page(&self, page_no: u32) -> Result<u32, IdbError> {
        let rec = match self {
            Located::Match(rec) => rec,
            Located::Between { prev, next } if prev.is_infimum() => next,
            Located::Between { prev, .. } => prev,
        };
        rec.child_page
            .ok_or_else(|| IdbError::corrupt(page_no, "internal page has no node pointers"))
    }
}

/// Read-only query engine over one table's clustered index.
pub struct TableReader {
    ts: Tablespace,
    codec: RecordReader,
    config: ReaderConfig,
    root: u32,
    index_id: u64,
}

impl TableReader {
    /// Open a tablespace file and locate the clustered index of `table`.
    pub fn open<P: AsRef<std::path::Path>>(
        path: P,
        table: TableDef,
        config: ReaderConfig,
    ) -> Result<Self, IdbError> {
        let ts = Tablespace::open(path, &config)?;
        Self::from_tablespace(ts, table, config)
    }

    /// Build a reader over an already opened tablespace.
    pub fn from_tablespace(
        mut ts: Tablespace,
        table: TableDef,
        config: ReaderConfig,
    ) -> Result<Self, IdbError> {
        let codec = RecordReader::new(table, &config)?;
        let (root, index) = resolve_root(&mut ts, &config)?;
        debug!(
            table = %codec.table().name,
            root,
            index_id = index.header.index_id,
            levels = index.level() + 1,
            "opened clustered index"
        );
        Ok(TableReader {
            ts,
            codec,
            config,
            root,
            index_id: index.header.index_id,
        })
    }

    /// Close the underlying file. Equivalent to dropping the reader.
    pub fn close(self) {
        debug!(root = self.root, "closing table reader");
    }

    pub fn root_page(&self) -> u32 {
        self.root
    }

    /// Index id shared by every page of the clustered index.
    pub fn index_id(&self) -> u64 {
        self.index_id
    }

    pub fn table(&self) -> &TableDef {
        self.codec.table()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn num_of_pages(&self) -> u64 {
        self.ts.num_of_pages()
    }

    /// Load and frame any page by number.
    pub fn read_page(&mut self, page_num: u32) -> Result<Page, IdbError> {
        self.ts.load_page(page_num)
    }

    /// Load any page by number and decode its structure.
    pub fn decode_page(&mut self, page_num: u32) -> Result<PageBody, IdbError> {
        decode_page(&self.ts.load_page(page_num)?)
    }

    /// Find the record whose key equals `key`.
    ///
    /// `key` must give every key field; a prefix is an
    /// [`IdbError::Argument`]. Delete-marked records are reported as absent
    /// unless the config includes them.
    pub fn query_by_primary_key(
        &mut self,
        key: &[FieldValue],
    ) -> Result<Option<Record>, IdbError> {
        if key.len() != self.codec.key_len() {
            return Err(IdbError::Argument(format!(
                "primary key has {} fields, {} given",
                self.codec.key_len(),
                key.len()
            )));
        }

        let (page, index) = self.descend(Some(key), SearchMode::Exact)?;
        match self.search_page(&page, &index, key, SearchMode::Exact)? {
            Located::Match(rec) if self.is_visible(&rec) => {
                let full = self.codec.read_record(
                    &page,
                    rec.origin,
                    true,
                    DecodeMode::Full,
                    &mut self.ts,
                )?;
                Ok(Some(full))
            }
            _ => Ok(None),
        }
    }

    /// Visit every leaf record in ascending key order, depth first.
    pub fn traverse<F: FnMut(Record)>(&mut self, mut visit: F) -> Result<(), IdbError> {
        self.walk(self.root, None, &mut visit)
    }

    /// Every leaf record in ascending key order.
    pub fn query_all(&mut self) -> Result<Vec<Record>, IdbError> {
        let mut out = Vec::new();
        self.traverse(|rec| out.push(rec))?;
        Ok(out)
    }

    /// Full scan keeping records that pass `predicate`, optionally projected
    /// onto the columns at `projection`.
    pub fn query_all_with<P>(
        &mut self,
        mut predicate: P,
        projection: Option<&[usize]>,
    ) -> Result<Vec<Record>, IdbError>
    where
        P: FnMut(&Record) -> bool,
    {
        let mut out = Vec::new();
        self.traverse(|rec| {
            if predicate(&rec) {
                out.push(rec);
            }
        })?;
        match projection {
            Some(cols) => out.iter().map(|rec| rec.project(cols)).collect(),
            None => Ok(out),
        }
    }

    /// Lazily iterate the records with `lower <= key < upper`.
    ///
    /// Either bound may be absent, and may be a key prefix. Fails with
    /// [`IdbError::Argument`] before reading anything if `lower > upper`.
    /// Equal full-length bounds behave as a point lookup; any other pair of
    /// bounds whose upper is a prefix of the lower is empty.
    pub fn range_query_iter(
        &mut self,
        lower: Option<&[FieldValue]>,
        upper: Option<&[FieldValue]>,
    ) -> Result<RangeIter<'_>, IdbError> {
        let key_len = self.codec.key_len();
        for bound in [lower, upper].into_iter().flatten() {
            if bound.is_empty() || bound.len() > key_len {
                return Err(IdbError::Argument(format!(
                    "range bound has {} fields, primary key has {}",
                    bound.len(),
                    key_len
                )));
            }
        }

        if let (Some(lo), Some(hi)) = (lower, upper) {
            match compare_keys(lo, hi) {
                Ordering::Greater => {
                    return Err(IdbError::Argument(
                        "range lower bound is above the upper bound".to_string(),
                    ))
                }
                // An upper bound that is a prefix of the lower one excludes it
                Ordering::Equal if lo.len() >= hi.len() => {
                    let found = if lo.len() == key_len && hi.len() == key_len {
                        self.query_by_primary_key(lo)?
                    } else {
                        None
                    };
                    return Ok(RangeIter::from_records(self, found.into_iter().collect()));
                }
                _ => {}
            }
        }

        let start_mode = match lower {
            Some(k) if k.len() == key_len => SearchMode::Exact,
            _ => SearchMode::LowerBound,
        };
        let start_page = self.descend(lower, start_mode)?.1.page_number;
        let end_page = match upper {
            Some(k) => Some(self.descend(Some(k), SearchMode::LowerBound)?.1.page_number),
            None => None,
        };
        debug!(start_page, ?end_page, "range scan");

        Ok(RangeIter::new(
            self,
            lower.map(<[FieldValue]>::to_vec),
            upper.map(<[FieldValue]>::to_vec),
            start_page,
            end_page,
        ))
    }

    /// Eager form of [`range_query_iter`](Self::range_query_iter). With both
    /// bounds absent this is [`query_all`](Self::query_all).
    pub fn range_query_by_primary_key(
        &mut self,
        lower: Option<&[FieldValue]>,
        upper: Option<&[FieldValue]>,
    ) -> Result<Vec<Record>, IdbError> {
        if lower.is_none() && upper.is_none() {
            return self.query_all();
        }
        self.range_query_iter(lower, upper)?.collect()
    }

    /// Fill of one INDEX page.
    pub fn page_fill(&mut self, page_num: u32) -> Result<PageFill, IdbError> {
        let page = self.ts.load_page(page_num)?;
        Ok(PageFill::from(&IndexPage::parse(&page)?))
    }

    /// Fill aggregated over every page of the clustered index.
    ///
    /// Pages are found with header-only reads; only INDEX pages are loaded
    /// in full to check their index id.
    pub fn fill_stats(&mut self) -> Result<FillStats, IdbError> {
        let mut fills = Vec::new();
        for page_num in 0..self.ts.num_of_pages() as u32 {
            if self.ts.load_page_header(page_num)?.page_type != PageType::Index {
                continue;
            }
            let page = self.ts.load_page(page_num)?;
            let index = IndexPage::parse(&page)?;
            if index.header.index_id == self.index_id {
                fills.push(PageFill::from(&index));
            }
        }
        Ok(fills.iter().collect())
    }

    pub(crate) fn is_visible(&self, rec: &Record) -> bool {
        self.config.include_deleted || !rec.is_deleted()
    }

    /// Decode the records of leaf page `page_num` and return them with the
    /// right sibling.
    pub(crate) fn leaf_records(
        &mut self,
        page_num: u32,
    ) -> Result<(Vec<Record>, Option<u32>), IdbError> {
        let (page, index) = self.load_index(page_num)?;
        if !index.is_leaf() {
            return Err(IdbError::corrupt(
                page_num,
                format!("expected a leaf page, found level {}", index.level()),
            ));
        }
        let records = self.page_records(&page, &index)?;
        Ok((records, index.next_page))
    }

    fn load_index(&mut self, page_num: u32) -> Result<(Page, IndexPage), IdbError> {
        let page = self.ts.load_page(page_num)?;
        page.expect_type(PageType::Index)?;
        let index = IndexPage::parse(&page)?;
        if index.header.index_id != self.index_id {
            return Err(IdbError::corrupt(
                page_num,
                format!(
                    "page belongs to index {}, not the clustered index {}",
                    index.header.index_id, self.index_id
                ),
            ));
        }
        Ok((page, index))
    }

    /// Decode all user records of a page and check them against its header.
    fn page_records(&mut self, page: &Page, index: &IndexPage) -> Result<Vec<Record>, IdbError> {
        let mode = if index.is_leaf() {
            DecodeMode::Full
        } else {
            DecodeMode::KeyOnly
        };
        let records = self.codec.page_records(page, index, mode, &mut self.ts)?;
        if records.len() != index.n_recs() {
            if self.config.strict_record_count {
                return Err(IdbError::corrupt(
                    page.number(),
                    format!(
                        "header declares {} records, chain holds {}",
                        index.n_recs(),
                        records.len()
                    ),
                ));
            }
            warn!(
                page = page.number(),
                declared = index.n_recs(),
                found = records.len(),
                "record count mismatch"
            );
        }
        Ok(records)
    }

    fn walk<F: FnMut(Record)>(
        &mut self,
        page_num: u32,
        parent_level: Option<u16>,
        visit: &mut F,
    ) -> Result<(), IdbError> {
        let (page, index) = self.load_index(page_num)?;
        check_level(&index, parent_level)?;
        let records = self.page_records(&page, &index)?;
        trace!(page = page_num, level = index.level(), records = records.len(), "visiting page");

        if index.is_leaf() {
            for rec in records.into_iter().filter(|r| self.is_visible(r)) {
                visit(rec);
            }
            return Ok(());
        }
        for rec in records {
            let child = rec.child_page.ok_or_else(|| {
                IdbError::corrupt(page_num, format!("node pointer at {} has no child", rec.origin))
            })?;
            self.walk(child, Some(index.level()), visit)?;
        }
        Ok(())
    }

    /// Descend from the root to the leaf where `target` belongs, or to the
    /// leftmost leaf when there is no target.
    fn descend(
        &mut self,
        target: Option<&[FieldValue]>,
        mode: SearchMode,
    ) -> Result<(Page, IndexPage), IdbError> {
        let mut page_num = self.root;
        let mut parent_level = None;
        loop {
            let (page, index) = self.load_index(page_num)?;
            check_level(&index, parent_level)?;
            if index.is_leaf() {
                return Ok((page, index));
            }

            let child = match target {
                Some(key) => self
                    .search_page(&page, &index, key, mode)?
                    .child_page(page_num)?,
                None => self.first_child(&page, &index)?,
            };
            debug!(page = page_num, level = index.level(), child, "descending");
            parent_level = Some(index.level());
            page_num = child;
        }
    }

    fn first_child(&mut self, page: &Page, index: &IndexPage) -> Result<u32, IdbError> {
        let infimum =
            self.codec
                .read_record(page, PAGE_NEW_INFIMUM, false, DecodeMode::KeyOnly, &mut self.ts)?;
        let first = infimum
            .next_origin()
            .ok_or_else(|| IdbError::corrupt(index.page_number, "infimum has no successor"))?;
        let rec = self
            .codec
            .read_record(page, first, false, DecodeMode::KeyOnly, &mut self.ts)?;
        Located::Between {
            prev: infimum,
            next: rec,
        }
        .child_page(index.page_number)
    }

    /// Position `target` on one page: binary search over the directory
    /// slots, then a linear scan from one slot before the convergence point.
    fn search_page(
        &mut self,
        page: &Page,
        index: &IndexPage,
        target: &[FieldValue],
        mode: SearchMode,
    ) -> Result<Located, IdbError> {
        let is_leaf = index.is_leaf();
        let slots = &index.dir_slots;

        let (mut lo, mut hi) = (0, slots.len() - 1);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            let rec = self.codec.read_record(
                page,
                slots[mid] as usize,
                is_leaf,
                DecodeMode::KeyOnly,
                &mut self.ts,
            )?;
            match (rec.compare_key(target), mode) {
                (Ordering::Equal, SearchMode::Exact) => return Ok(Located::Match(rec)),
                (Ordering::Less, _) => lo = mid,
                _ => hi = mid,
            }
        }

        let start = slots[lo.saturating_sub(1)] as usize;
        let mut prev =
            self.codec
                .read_record(page, start, is_leaf, DecodeMode::KeyOnly, &mut self.ts)?;
        for _ in 0..index.max_chain_steps() {
            let next = prev.next_origin().ok_or_else(|| {
                IdbError::corrupt(page.number(), "record chain ends before the supremum")
            })?;
            let rec =
                self.codec
                    .read_record(page, next, is_leaf, DecodeMode::KeyOnly, &mut self.ts)?;
            match (rec.compare_key(target), mode) {
                (Ordering::Equal, SearchMode::Exact) => return Ok(Located::Match(rec)),
                (Ordering::Less, _) => prev = rec,
                _ => return Ok(Located::Between { prev, next: rec }),
            }
        }
        Err(IdbError::corrupt(
            page.number(),
            "record chain does not reach the supremum",
        ))
    }
}

/// Children sit exactly one level below their parent.
fn check_level(index: &IndexPage, parent_level: Option<u16>) -> Result<(), IdbError> {
    match parent_level {
        Some(parent) if index.level() + 1 != parent => Err(IdbError::corrupt(
            index.page_number,
            format!(
                "child at level {} under a parent at level {}",
                index.level(),
                parent
            ),
        )),
        _ => Ok(()),
    }
}

/// Find the clustered index root: the configured page, or the first INDEX
/// page from page 3 on, skipping up to `root_search_limit` SDI pages.
fn resolve_root(
    ts: &mut Tablespace,
    config: &ReaderConfig,
) -> Result<(u32, IndexPage), IdbError> {
    let mut page_num = config.root_page.unwrap_or(FIRST_ROOT_PAGE);
    let mut skipped = 0;
    loop {
        if page_num as u64 >= ts.num_of_pages() {
            return Err(IdbError::corrupt(
                page_num,
                format!(
                    "no clustered index root (tablespace has {} pages)",
                    ts.num_of_pages()
                ),
            ));
        }
        let page = ts.load_page(page_num)?;
        match page.page_type() {
            PageType::Sdi if config.root_page.is_none() && skipped < config.root_search_limit => {
                trace!(page = page_num, "skipping SDI page");
                skipped += 1;
                page_num += 1;
            }
            PageType::Index => {
                let index = IndexPage::parse(&page)?;
                if !index.is_root() {
                    return Err(IdbError::corrupt(
                        page_num,
                        "root candidate has sibling pages",
                    ));
                }
                return Ok((page_num, index));
            }
            other => {
                return Err(IdbError::corrupt(
                    page_num,
                    format!("expected the clustered index root, found a {} page", other),
                ))
            }
        }
    }
}
