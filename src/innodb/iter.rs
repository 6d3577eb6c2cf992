//! Lazy range iteration and record iterator adapters.
//!
//! [`RangeIter`] walks the leaf level of the clustered index along the
//! right-sibling links, decoding one page at a time. The lower bound is only
//! applied to the first page and the upper bound only to the end page found
//! by the initial descent; pages in between lie entirely inside the range.
//!
//! The iterator borrows its [`TableReader`] mutably, so the reader cannot be
//! closed or queried while a scan is in progress.

use std::cmp::Ordering;
use std::collections::VecDeque;

use tracing::trace;

use crate::innodb::btree::TableReader;
use crate::innodb::field_decode::FieldValue;
use crate::innodb::record::Record;
use crate::IdbError;

/// Forward-only, single-pass iterator over a primary-key range.
pub struct RangeIter<'r> {
    reader: &'r mut TableReader,
    lower: Option<Vec<FieldValue>>,
    upper: Option<Vec<FieldValue>>,
    next_page: Option<u32>,
    end_page: Option<u32>,
    first: bool,
    buffer: VecDeque<Record>,
    visited: u64,
}

impl<'r> RangeIter<'r> {
    pub(crate) fn new(
        reader: &'r mut TableReader,
        lower: Option<Vec<FieldValue>>,
        upper: Option<Vec<FieldValue>>,
        start_page: u32,
        end_page: Option<u32>,
    ) -> Self {
        RangeIter {
            reader,
            lower,
            upper,
            next_page: Some(start_page),
            end_page,
            first: true,
            buffer: VecDeque::new(),
            visited: 0,
        }
    }

    /// An iterator over records that are already decoded.
    pub(crate) fn from_records(reader: &'r mut TableReader, records: Vec<Record>) -> Self {
        RangeIter {
            reader,
            lower: None,
            upper: None,
            next_page: None,
            end_page: None,
            first: false,
            buffer: records.into(),
            visited: 0,
        }
    }

    /// Decode leaf page `page_num` into the buffer and advance to its sibling.
    fn fill(&mut self, page_num: u32) -> Result<(), IdbError> {
        self.visited += 1;
        if self.visited > self.reader.num_of_pages() {
            return Err(IdbError::corrupt(
                page_num,
                "leaf sibling chain visits more pages than the tablespace holds",
            ));
        }

        let (records, next) = self.reader.leaf_records(page_num)?;
        let is_first = std::mem::take(&mut self.first);
        let is_end = self.end_page == Some(page_num);

        for rec in records {
            if !self.reader.is_visible(&rec) {
                continue;
            }
            if let (true, Some(lo)) = (is_first, &self.lower) {
                if rec.compare_key(lo) == Ordering::Less {
                    continue;
                }
            }
            if let (true, Some(hi)) = (is_end, &self.upper) {
                if rec.compare_key(hi) != Ordering::Less {
                    break;
                }
            }
            self.buffer.push_back(rec);
        }

        trace!(
            page = page_num,
            buffered = self.buffer.len(),
            ?next,
            "range scan page"
        );
        self.next_page = if is_end { None } else { next };
        Ok(())
    }
}

impl Iterator for RangeIter<'_> {
    type Item = Result<Record, IdbError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(rec) = self.buffer.pop_front() {
                return Some(Ok(rec));
            }
            let page_num = self.next_page.take()?;
            if let Err(e) = self.fill(page_num) {
                self.next_page = None;
                return Some(Err(e));
            }
        }
    }
}

/// Adapters for iterators of decoded records.
pub trait RecordIterExt: Iterator<Item = Result<Record, IdbError>> + Sized {
    /// Remap every record with `f`, passing errors through unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::iter::RecordIterExt;
    /// use idbq::innodb::record::Record;
    /// use idbq::IdbError;
    ///
    /// let empty: Vec<Result<Record, IdbError>> = Vec::new();
    /// let projected = empty.into_iter().map_records(|rec| rec.project(&[0]));
    /// assert_eq!(projected.count(), 0);
    /// ```
    fn map_records<F>(self, f: F) -> MapRecords<Self, F>
    where
        F: FnMut(Record) -> Result<Record, IdbError>,
    {
        MapRecords { inner: self, f }
    }
}

impl<I: Iterator<Item = Result<Record, IdbError>>> RecordIterExt for I {}

/// Iterator returned by [`RecordIterExt::map_records`].
pub struct MapRecords<I, F> {
    inner: I,
    f: F,
}

impl<I, F> Iterator for MapRecords<I, F>
where
    I: Iterator<Item = Result<Record, IdbError>>,
    F: FnMut(Record) -> Result<Record, IdbError>,
{
    type Item = Result<Record, IdbError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|r| r.and_then(&mut self.f))
    }
}
