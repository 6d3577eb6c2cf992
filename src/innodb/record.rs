//! Row-level record decoding for InnoDB compact format.
//!
//! InnoDB stores rows in compact record format (MySQL 5.0+), where each record
//! has a 5-byte header containing the info bits, record type, heap number, and
//! next-record pointer. Below the header, growing toward lower addresses, sit
//! the null bitmap and the variable-length field list; field data starts at
//! the record origin and grows upward.
//!
//! [`RecordReader`] combines a [`TableDef`] with its clustered-index
//! [`RecordLayout`] and decodes records into [`Record`] values, following
//! overflow chains for externally stored columns.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::trace;

use crate::innodb::config::ReaderConfig;
use crate::innodb::constants::*;
use crate::innodb::cursor::ByteCursor;
use crate::innodb::field_decode::{compare_keys, decode_field, decode_system, FieldValue};
use crate::innodb::index::IndexPage;
use crate::innodb::lob::{read_external, OverflowPointer};
use crate::innodb::page::Page;
use crate::innodb::schema::{FieldLayout, FieldSource, RecordLayout, TableDef};
use crate::innodb::tablespace::PageSource;
use crate::IdbError;

/// Record type extracted from the info bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordType {
    /// Ordinary user record (leaf page).
    Ordinary,
    /// Node pointer record (non-leaf page).
    NodePtr,
    /// Infimum system record.
    Infimum,
    /// Supremum system record.
    Supremum,
}

impl RecordType {
    /// Convert a 3-bit status value from the record header to a `RecordType`.
    ///
    /// Only the lowest 3 bits of `val` are used; the unused codes 4-7 are
    /// rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::record::RecordType;
    ///
    /// assert_eq!(RecordType::from_u8(0), Some(RecordType::Ordinary));
    /// assert_eq!(RecordType::from_u8(3), Some(RecordType::Supremum));
    /// assert_eq!(RecordType::from_u8(0x08), Some(RecordType::Ordinary));
    /// assert_eq!(RecordType::from_u8(5), None);
    /// ```
    pub fn from_u8(val: u8) -> Option<Self> {
        match val & 0x07 {
            0 => Some(RecordType::Ordinary),
            1 => Some(RecordType::NodePtr),
            2 => Some(RecordType::Infimum),
            3 => Some(RecordType::Supremum),
            _ => None,
        }
    }

    /// Returns the MySQL source-style name for this record type (e.g. `"REC_STATUS_ORDINARY"`).
    pub fn name(&self) -> &'static str {
        match self {
            RecordType::Ordinary => "REC_STATUS_ORDINARY",
            RecordType::NodePtr => "REC_STATUS_NODE_PTR",
            RecordType::Infimum => "REC_STATUS_INFIMUM",
            RecordType::Supremum => "REC_STATUS_SUPREMUM",
        }
    }
}

/// Parsed compact record header.
///
/// In compact format, 5 bytes precede each record:
/// - Byte 0: info bits (delete mark, min_rec flag) + n_owned lower nibble
/// - Bytes 1-2: heap_no (13 bits) + rec_type (3 bits)
/// - Bytes 3-4: next record offset (signed, relative)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    /// Number of records owned by this record in the page directory.
    pub n_owned: u8,
    /// Delete mark flag.
    pub delete_mark: bool,
    /// Min-rec flag (leftmost record on a non-leaf level).
    pub min_rec: bool,
    /// Record's position in the heap.
    pub heap_no: u16,
    pub rec_type: RecordType,
    /// Relative offset to the next record (signed).
    pub next_offset: i16,
}

impl RecordHeader {
    /// Parse the 5-byte header preceding the record origin at `origin`.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::record::{RecordHeader, RecordType};
    /// use byteorder::{BigEndian, ByteOrder};
    ///
    /// let mut data = vec![0u8; 10];
    /// // delete_mark=1 (bit 5), n_owned=2 (bits 0-3)
    /// data[0] = 0x22;
    /// // heap_no=7, rec_type=0 (Ordinary)
    /// BigEndian::write_u16(&mut data[1..3], 7 << 3);
    /// BigEndian::write_i16(&mut data[3..5], 42);
    ///
    /// let hdr = RecordHeader::parse(&data, 5).unwrap();
    /// assert_eq!(hdr.n_owned, 2);
    /// assert!(hdr.delete_mark);
    /// assert!(!hdr.min_rec);
    /// assert_eq!(hdr.heap_no, 7);
    /// assert_eq!(hdr.rec_type, RecordType::Ordinary);
    /// assert_eq!(hdr.next_offset, 42);
    /// ```
    pub fn parse(page_data: &[u8], origin: usize) -> Result<Self, IdbError> {
        let start = origin
            .checked_sub(REC_N_NEW_EXTRA_BYTES)
            .ok_or(IdbError::Bounds {
                offset: origin,
                len: REC_N_NEW_EXTRA_BYTES,
                size: page_data.len(),
            })?;
        let mut c = ByteCursor::at(page_data, start)?;

        // Info bits in the upper nibble: 0x20 = delete mark, 0x10 = min_rec
        let byte0 = c.read_u8()?;
        let two_bytes = c.read_u16()?;
        let next_offset = c.read_i16()?;
        let rec_type = RecordType::from_u8((two_bytes & 0x07) as u8).ok_or_else(|| {
            IdbError::Parse(format!(
                "invalid record status {} at offset {}",
                two_bytes & 0x07,
                origin
            ))
        })?;

        Ok(RecordHeader {
            n_owned: byte0 & 0x0F,
            delete_mark: byte0 & 0x20 != 0,
            min_rec: byte0 & 0x10 != 0,
            heap_no: (two_bytes >> 3) & 0x1FFF,
            rec_type,
            next_offset,
        })
    }
}

/// A decoded record.
///
/// Infimum and supremum come back as sentinels with an empty key that
/// compare below and above every key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub page_number: u32,
    /// Absolute offset of the record origin within its page.
    pub origin: usize,
    pub header: RecordHeader,
    /// Clustered key fields, in primary-key order.
    pub key: Vec<FieldValue>,
    /// Column values in table order. Empty for node pointers and
    /// key-only decodes.
    pub values: Vec<FieldValue>,
    /// Hidden `DB_TRX_ID` of leaf records.
    pub trx_id: Option<u64>,
    /// Hidden `DB_ROLL_PTR` of leaf records.
    pub roll_ptr: Option<u64>,
    /// Child page of node pointer records.
    pub child_page: Option<u32>,
}

impl Record {
    pub fn rec_type(&self) -> RecordType {
        self.header.rec_type
    }

    pub fn is_infimum(&self) -> bool {
        self.rec_type() == RecordType::Infimum
    }

    pub fn is_supremum(&self) -> bool {
        self.rec_type() == RecordType::Supremum
    }

    /// An ordinary or node pointer record.
    pub fn is_user(&self) -> bool {
        matches!(self.rec_type(), RecordType::Ordinary | RecordType::NodePtr)
    }

    pub fn is_deleted(&self) -> bool {
        self.header.delete_mark
    }

    /// Origin of the next record in the chain, `None` after the supremum.
    pub fn next_origin(&self) -> Option<usize> {
        if self.is_supremum() || self.header.next_offset == 0 {
            return None;
        }
        usize::try_from(self.origin as isize + self.header.next_offset as isize).ok()
    }

    /// Compare this record's key against `target`; infimum is below and
    /// supremum above everything.
    pub fn compare_key(&self, target: &[FieldValue]) -> Ordering {
        match self.rec_type() {
            RecordType::Infimum => Ordering::Less,
            RecordType::Supremum => Ordering::Greater,
            _ => compare_keys(&self.key, target),
        }
    }

    /// The value of the column at `index` (table order).
    pub fn value(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// A copy of this record keeping only the columns at `indices`, in that order.
    pub fn project(&self, indices: &[usize]) -> Result<Record, IdbError> {
        let values = indices
            .iter()
            .map(|&i| {
                self.values.get(i).cloned().ok_or_else(|| {
                    IdbError::Argument(format!(
                        "column index {} out of range ({} columns)",
                        i,
                        self.values.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Record {
            values,
            ..self.clone()
        })
    }
}

/// How much of a record to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Header, key and child pointer only. Used while searching.
    KeyOnly,
    /// Every field, with overflow chains resolved.
    Full,
}

/// Walks the extra bytes below the record header toward lower addresses.
struct ExtraBytes<'p> {
    data: &'p [u8],
    /// One past the next byte to read.
    end: usize,
    page: u32,
}

impl ExtraBytes<'_> {
    fn next(&mut self) -> Result<u8, IdbError> {
        self.end = self
            .end
            .checked_sub(1)
            .ok_or_else(|| IdbError::corrupt(self.page, "record header runs off the page"))?;
        Ok(self.data[self.end])
    }
}

/// Null flags of a record. Bit `i` of the bitmap lives in the byte
/// `i / 8` positions below the header, at bit `i % 8`.
struct NullBits<'p> {
    data: &'p [u8],
    /// Offset of the record header (the bitmap ends here).
    end: usize,
}

impl NullBits<'_> {
    fn is_null(&self, bit: usize) -> bool {
        self.data[self.end - 1 - bit / 8] & (1 << (bit % 8)) != 0
    }
}

/// Decodes clustered-index records of one table.
#[derive(Debug, Clone)]
pub struct RecordReader {
    table: TableDef,
    layout: RecordLayout,
    timestamp_offset_secs: i32,
}

impl RecordReader {
    /// Validate `table` and compute its clustered-index layout.
    pub fn new(table: TableDef, config: &ReaderConfig) -> Result<Self, IdbError> {
        let layout = RecordLayout::new(&table)?;
        Ok(RecordReader {
            table,
            layout,
            timestamp_offset_secs: config.timestamp_offset_secs,
        })
    }

    pub fn table(&self) -> &TableDef {
        &self.table
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Number of clustered key fields.
    pub fn key_len(&self) -> usize {
        self.layout.key_fields.len()
    }

    /// Decode the record whose origin is at `origin` on `page`.
    ///
    /// `is_leaf` is the page level check: leaf pages may only hold ordinary
    /// records, internal pages only node pointers. `src` is used to follow
    /// overflow chains of externally stored columns.
    pub fn read_record<S: PageSource + ?Sized>(
        &self,
        page: &Page,
        origin: usize,
        is_leaf: bool,
        mode: DecodeMode,
        src: &mut S,
    ) -> Result<Record, IdbError> {
        let number = page.number();
        let data = page.data();
        let header = RecordHeader::parse(data, origin)
            .map_err(|e| IdbError::corrupt(number, format!("record at {}: {}", origin, e)))?;

        match header.rec_type {
            RecordType::Supremum => {}
            _ => check_next_offset(number, origin, header.next_offset)?,
        }

        let mut rec = Record {
            page_number: number,
            origin,
            header,
            key: Vec::new(),
            values: Vec::new(),
            trx_id: None,
            roll_ptr: None,
            child_page: None,
        };

        match (rec.header.rec_type, is_leaf) {
            (RecordType::Infimum, _) | (RecordType::Supremum, _) => return Ok(rec),
            (RecordType::Ordinary, true) | (RecordType::NodePtr, false) => {}
            (t, _) => {
                return Err(IdbError::corrupt(
                    number,
                    format!(
                        "{} record at {} on a {} page",
                        t.name(),
                        origin,
                        if is_leaf { "leaf" } else { "non-leaf" }
                    ),
                ))
            }
        }

        let header_start = origin - REC_N_NEW_EXTRA_BYTES;
        let null_len = self.layout.null_bitmap_len();
        let nulls = NullBits {
            data,
            end: header_start,
        };
        let mut lens = ExtraBytes {
            data,
            end: header_start.checked_sub(null_len).ok_or_else(|| {
                IdbError::corrupt(number, format!("null bitmap of record at {} underflows", origin))
            })?,
            page: number,
        };
        let mut body = page.cursor_at(origin)?;

        for field in &self.layout.key_fields {
            let value = self.read_field(page, field, &nulls, &mut lens, &mut body, src)?;
            rec.key.push(value);
        }

        if !is_leaf {
            rec.child_page = Some(body.read_u32()?);
            return Ok(rec);
        }
        if mode == DecodeMode::KeyOnly {
            return Ok(rec);
        }

        rec.trx_id = Some(body.read_u48()?);
        rec.roll_ptr = Some(body.read_uint(DATA_ROLL_PTR_LEN)?);

        let mut values = vec![FieldValue::Null; self.table.columns.len()];
        for (field, key) in self.layout.key_fields.iter().zip(&rec.key) {
            if let FieldSource::Column(i) = field.source {
                values[i] = key.clone();
            }
        }
        for field in &self.layout.value_fields {
            let value = self.read_field(page, field, &nulls, &mut lens, &mut body, src)?;
            if let FieldSource::Column(i) = field.source {
                values[i] = value;
            }
        }
        rec.values = values;
        trace!(page = number, origin, "decoded record");
        Ok(rec)
    }

    fn read_field<S: PageSource + ?Sized>(
        &self,
        page: &Page,
        field: &FieldLayout,
        nulls: &NullBits<'_>,
        lens: &mut ExtraBytes<'_>,
        body: &mut ByteCursor<'_>,
        src: &mut S,
    ) -> Result<FieldValue, IdbError> {
        if let Some(bit) = field.null_bit {
            if nulls.is_null(bit) {
                return Ok(FieldValue::Null);
            }
        }

        let (len, external) = match field.fixed_len {
            Some(n) => (n, false),
            None => {
                let b = lens.next()? as usize;
                if field.is_big && b & 0x80 != 0 {
                    let b2 = lens.next()? as usize;
                    (((b & 0x3F) << 8) | b2, b & 0x40 != 0)
                } else {
                    (b, false)
                }
            }
        };

        let stored = body.read_bytes(len)?;
        let bytes = if external {
            let inline_len = len.checked_sub(BTR_EXTERN_FIELD_REF_SIZE).ok_or_else(|| {
                IdbError::corrupt(
                    page.number(),
                    format!("external field of {} bytes is shorter than its pointer", len),
                )
            })?;
            let ptr = OverflowPointer::parse(&stored[inline_len..])?;
            trace!(
                page = page.number(),
                overflow_page = ptr.page_no,
                length = ptr.length,
                "resolving external field"
            );
            let mut value = stored[..inline_len].to_vec();
            value.extend_from_slice(&read_external(src, &ptr)?);
            std::borrow::Cow::Owned(value)
        } else {
            std::borrow::Cow::Borrowed(stored)
        };

        Ok(match field.source {
            FieldSource::RowId => decode_system(&bytes),
            FieldSource::Column(i) => {
                decode_field(&bytes, &self.table.columns[i], self.timestamp_offset_secs)
            }
        })
    }

    /// Decode every user record of `index` in chain order, delete-marked
    /// ones included.
    ///
    /// Fails with [`IdbError::CorruptPage`] if the chain does not reach the
    /// supremum within `n_heap + 2` steps.
    pub fn page_records<S: PageSource + ?Sized>(
        &self,
        page: &Page,
        index: &IndexPage,
        mode: DecodeMode,
        src: &mut S,
    ) -> Result<Vec<Record>, IdbError> {
        let is_leaf = index.is_leaf();
        let mut records = Vec::with_capacity(index.n_recs());
        let mut rec = self.read_record(page, PAGE_NEW_INFIMUM, is_leaf, mode, src)?;
        for _ in 0..index.max_chain_steps() {
            let next = match rec.next_origin() {
                Some(next) => next,
                None => return Ok(records),
            };
            rec = self.read_record(page, next, is_leaf, mode, src)?;
            if rec.is_infimum() {
                break;
            }
            if rec.is_user() {
                records.push(rec.clone());
            }
        }
        Err(IdbError::corrupt(
            page.number(),
            "record chain does not reach the supremum",
        ))
    }
}

fn check_next_offset(page: u32, origin: usize, next_offset: i16) -> Result<(), IdbError> {
    let next = origin as isize + next_offset as isize;
    if next_offset == 0
        || next < PAGE_NEW_SUPREMUM as isize
        || next >= (SIZE_PAGE - SIZE_FIL_TRAILER) as isize
    {
        return Err(IdbError::corrupt(
            page,
            format!(
                "record at {} has next offset {} pointing outside the page body",
                origin, next_offset
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};
    use crate::innodb::schema::{ColumnDef, TableDef};
    use std::collections::HashMap;

    struct NoPages;

    impl PageSource for NoPages {
        fn load_page(&mut self, page_num: u32) -> Result<Page, IdbError> {
            Err(IdbError::Argument(format!("no page {}", page_num)))
        }
    }

    struct MemPages(HashMap<u32, Vec<u8>>);

    impl PageSource for MemPages {
        fn load_page(&mut self, page_num: u32) -> Result<Page, IdbError> {
            let buf = self
                .0
                .get(&page_num)
                .cloned()
                .ok_or_else(|| IdbError::Argument(format!("no page {}", page_num)))?;
            Page::parse(page_num, buf)
        }
    }

    fn table() -> TableDef {
        TableDef::new("t")
            .with_column(ColumnDef::parse("id", "int").unwrap())
            .with_column(ColumnDef::parse("name", "varchar(10)").unwrap().nullable())
            .with_column(ColumnDef::parse("n", "int").unwrap().nullable())
            .with_primary_key(&["id"])
    }

    fn write_header(buf: &mut [u8], origin: usize, flags: u8, heap_no: u16, status: u16, next: usize) {
        buf[origin - 5] = flags;
        BigEndian::write_u16(&mut buf[origin - 4..], (heap_no << 3) | status);
        BigEndian::write_i16(&mut buf[origin - 2..], (next as isize - origin as isize) as i16);
    }

    fn int(v: i32) -> [u8; 4] {
        ((v as u32) ^ 0x8000_0000).to_be_bytes()
    }

    /// Leaf page holding (1, "abc", NULL) and (2, NULL, 7), the second delete-marked.
    fn leaf_page() -> Vec<u8> {
        let mut buf = vec![0u8; SIZE_PAGE];
        BigEndian::write_u32(&mut buf[FIL_PAGE_PREV..], FIL_NULL);
        BigEndian::write_u32(&mut buf[FIL_PAGE_NEXT..], FIL_NULL);
        BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], 17855);
        let base = FIL_PAGE_DATA;
        BigEndian::write_u16(&mut buf[base + PAGE_N_DIR_SLOTS..], 2);
        BigEndian::write_u16(&mut buf[base + PAGE_N_HEAP..], 0x8004);
        BigEndian::write_u16(&mut buf[base + PAGE_N_RECS..], 2);
        buf[PAGE_NEW_INFIMUM..PAGE_NEW_INFIMUM + 8].copy_from_slice(INFIMUM_LITERAL);
        buf[PAGE_NEW_SUPREMUM..PAGE_NEW_SUPREMUM_END].copy_from_slice(SUPREMUM_LITERAL);

        // Record 1: extra = [len 3][nulls 0b10][header], body = id trx roll "abc"
        let r1 = 128;
        buf[r1 - 6] = 0b10;
        buf[r1 - 7] = 3;
        buf[r1..r1 + 4].copy_from_slice(&int(1));
        BigEndian::write_u32(&mut buf[r1 + 6..], 0x11); // low bytes of trx id
        buf[r1 + 17..r1 + 20].copy_from_slice(b"abc");

        // Record 2: extra = [nulls 0b01][header], body = id trx roll n
        let r2 = 160;
        buf[r2 - 6] = 0b01;
        buf[r2..r2 + 4].copy_from_slice(&int(2));
        buf[r2 + 17..r2 + 21].copy_from_slice(&int(7));

        write_header(&mut buf, PAGE_NEW_INFIMUM, 0x01, 0, 2, r1);
        write_header(&mut buf, r1, 0, 2, 0, r2);
        write_header(&mut buf, r2, 0x20, 3, 0, PAGE_NEW_SUPREMUM);
        write_header(&mut buf, PAGE_NEW_SUPREMUM, 0x03, 1, 3, PAGE_NEW_SUPREMUM);
        BigEndian::write_u16(&mut buf[base + PAGE_HEAP_TOP..], 200);

        let dir_end = SIZE_PAGE - SIZE_FIL_TRAILER;
        BigEndian::write_u16(&mut buf[dir_end - 2..], PAGE_NEW_INFIMUM as u16);
        BigEndian::write_u16(&mut buf[dir_end - 4..], PAGE_NEW_SUPREMUM as u16);
        buf
    }

    #[test]
    fn test_record_type_from_u8() {
        assert_eq!(RecordType::from_u8(1), Some(RecordType::NodePtr));
        assert_eq!(RecordType::from_u8(2), Some(RecordType::Infimum));
        assert_eq!(RecordType::from_u8(7), None);
    }

    #[test]
    fn test_header_with_flags() {
        let mut data = vec![0u8; 8];
        data[0] = 0x32; // delete_mark, min_rec, n_owned=2
        BigEndian::write_u16(&mut data[1..3], (10 << 3) | 1);
        BigEndian::write_i16(&mut data[3..5], -50);

        let hdr = RecordHeader::parse(&data, 5).unwrap();
        assert_eq!(hdr.n_owned, 2);
        assert!(hdr.delete_mark);
        assert!(hdr.min_rec);
        assert_eq!(hdr.heap_no, 10);
        assert_eq!(hdr.rec_type, RecordType::NodePtr);
        assert_eq!(hdr.next_offset, -50);
        assert!(RecordHeader::parse(&data, 3).is_err());
    }

    #[test]
    fn test_decode_leaf_records() {
        let page = Page::parse(3, leaf_page()).unwrap();
        let index = IndexPage::parse(&page).unwrap();
        let reader = RecordReader::new(table(), &ReaderConfig::default()).unwrap();

        let recs = reader
            .page_records(&page, &index, DecodeMode::Full, &mut NoPages)
            .unwrap();
        assert_eq!(recs.len(), 2);

        assert_eq!(recs[0].key, vec![FieldValue::Int(1)]);
        assert_eq!(
            recs[0].values,
            vec![FieldValue::Int(1), FieldValue::Str("abc".into()), FieldValue::Null]
        );
        assert_eq!(recs[0].trx_id, Some(0x11));
        assert!(!recs[0].is_deleted());

        assert_eq!(
            recs[1].values,
            vec![FieldValue::Int(2), FieldValue::Null, FieldValue::Int(7)]
        );
        assert!(recs[1].is_deleted());
    }

    #[test]
    fn test_key_only_decode() {
        let page = Page::parse(3, leaf_page()).unwrap();
        let reader = RecordReader::new(table(), &ReaderConfig::default()).unwrap();
        let rec = reader
            .read_record(&page, 128, true, DecodeMode::KeyOnly, &mut NoPages)
            .unwrap();
        assert_eq!(rec.key, vec![FieldValue::Int(1)]);
        assert!(rec.values.is_empty());
        assert_eq!(rec.trx_id, None);
        assert_eq!(rec.next_origin(), Some(160));
    }

    #[test]
    fn test_sentinels_compare_outside_keys() {
        let page = Page::parse(3, leaf_page()).unwrap();
        let reader = RecordReader::new(table(), &ReaderConfig::default()).unwrap();
        let inf = reader
            .read_record(&page, PAGE_NEW_INFIMUM, true, DecodeMode::KeyOnly, &mut NoPages)
            .unwrap();
        let sup = reader
            .read_record(&page, PAGE_NEW_SUPREMUM, true, DecodeMode::KeyOnly, &mut NoPages)
            .unwrap();
        let key = [FieldValue::Int(i64::MIN)];
        assert_eq!(inf.compare_key(&key), Ordering::Less);
        assert_eq!(sup.compare_key(&key), Ordering::Greater);
        assert_eq!(sup.next_origin(), None);
    }

    #[test]
    fn test_wrong_level_is_corrupt() {
        let page = Page::parse(3, leaf_page()).unwrap();
        let reader = RecordReader::new(table(), &ReaderConfig::default()).unwrap();
        assert!(matches!(
            reader.read_record(&page, 128, false, DecodeMode::Full, &mut NoPages),
            Err(IdbError::CorruptPage { .. })
        ));
    }

    #[test]
    fn test_bad_next_offset_is_corrupt() {
        let mut buf = leaf_page();
        BigEndian::write_i16(&mut buf[128 - 2..], 0);
        let page = Page::parse(3, buf).unwrap();
        let reader = RecordReader::new(table(), &ReaderConfig::default()).unwrap();
        assert!(matches!(
            reader.read_record(&page, 128, true, DecodeMode::Full, &mut NoPages),
            Err(IdbError::CorruptPage { .. })
        ));
    }

    #[test]
    fn test_chain_loop_is_corrupt() {
        let mut buf = leaf_page();
        // Second record points back at the first
        write_header(&mut buf, 160, 0, 3, 0, 128);
        let page = Page::parse(3, buf).unwrap();
        let index = IndexPage::parse(&page).unwrap();
        let reader = RecordReader::new(table(), &ReaderConfig::default()).unwrap();
        assert!(matches!(
            reader.page_records(&page, &index, DecodeMode::KeyOnly, &mut NoPages),
            Err(IdbError::CorruptPage { .. })
        ));
    }

    #[test]
    fn test_external_field() {
        let table = TableDef::new("t")
            .with_column(ColumnDef::parse("id", "int").unwrap())
            .with_column(ColumnDef::parse("doc", "blob").unwrap())
            .with_primary_key(&["id"]);
        let reader = RecordReader::new(table, &ReaderConfig::default()).unwrap();

        let mut buf = leaf_page();
        let r1 = 128;
        // 4 inline bytes + 20-byte pointer, external flag set
        let len = 24usize;
        buf[r1 - 6] = 0xC0 | (len >> 8) as u8;
        buf[r1 - 7] = len as u8;
        buf[r1 + 17..r1 + 21].copy_from_slice(b"head");
        let ptr = r1 + 21;
        BigEndian::write_u32(&mut buf[ptr + 4..], 9);
        BigEndian::write_u32(&mut buf[ptr + 8..], FIL_PAGE_DATA as u32);
        BigEndian::write_u32(&mut buf[ptr + 16..], 4);
        let page = Page::parse(3, buf).unwrap();

        let mut blob = vec![0u8; SIZE_PAGE];
        BigEndian::write_u16(&mut blob[FIL_PAGE_TYPE..], 10);
        BigEndian::write_u32(&mut blob[FIL_PAGE_DATA..], 4);
        BigEndian::write_u32(&mut blob[FIL_PAGE_DATA + 4..], FIL_NULL);
        blob[FIL_PAGE_DATA + 8..FIL_PAGE_DATA + 12].copy_from_slice(b"tail");
        let mut src = MemPages(HashMap::from([(9, blob)]));

        let rec = reader
            .read_record(&page, r1, true, DecodeMode::Full, &mut src)
            .unwrap();
        assert_eq!(rec.values[1], FieldValue::Bytes(b"headtail".to_vec()));
    }

    #[test]
    fn test_project() {
        let page = Page::parse(3, leaf_page()).unwrap();
        let reader = RecordReader::new(table(), &ReaderConfig::default()).unwrap();
        let rec = reader
            .read_record(&page, 128, true, DecodeMode::Full, &mut NoPages)
            .unwrap();
        let p = rec.project(&[1, 0]).unwrap();
        assert_eq!(p.values, vec![FieldValue::Str("abc".into()), FieldValue::Int(1)]);
        assert_eq!(p.key, rec.key);
        assert!(matches!(rec.project(&[3]), Err(IdbError::Argument(_))));
    }
}
