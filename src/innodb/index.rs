//! INDEX page internal structure parsing.
//!
//! INDEX pages (page type 17855 / `FIL_PAGE_INDEX`) are the B+Tree nodes that
//! store table data. Each INDEX page contains a 36-byte [`IndexHeader`] at
//! `FIL_PAGE_DATA` (byte 38), followed by two 10-byte FSEG inode pointers
//! ([`FsegHeader`]) for the leaf and non-leaf segments, the infimum/supremum
//! system records, the record heap, and finally the page directory growing
//! backward from the FIL trailer.
//!
//! [`IndexPage::parse`] decodes all of this and validates the system records
//! and directory slots before any record is touched.

use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::cursor::ByteCursor;
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::IdbError;

/// Parsed INDEX page header (36 bytes, at FIL_PAGE_DATA offset within an INDEX page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexHeader {
    /// Number of directory slots in the page directory.
    pub n_dir_slots: u16,
    /// Pointer to record heap top.
    pub heap_top: u16,
    /// Number of records in the heap. Bit 15 is the compact format flag.
    pub n_heap_raw: u16,
    /// Pointer to start of free record list (0 if none).
    pub free: u16,
    /// Number of bytes in deleted records (garbage).
    pub garbage: u16,
    /// Pointer to the last inserted record (0 if reset).
    pub last_insert: u16,
    /// Last insert direction.
    pub direction: u16,
    /// Number of consecutive inserts in the same direction.
    pub n_direction: u16,
    /// Number of user records on the page.
    pub n_recs: u16,
    /// Highest trx id that may have modified a record (secondary indexes only).
    pub max_trx_id: u64,
    /// Level in the B+Tree (0 = leaf).
    pub level: u16,
    /// Index ID where the page belongs.
    pub index_id: u64,
}

impl IndexHeader {
    /// Parse an INDEX page header from a full page buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::index::IndexHeader;
    /// use idbq::innodb::constants::*;
    /// use byteorder::{BigEndian, ByteOrder};
    ///
    /// let mut page = vec![0u8; 256];
    /// let base = FIL_PAGE_DATA;
    /// BigEndian::write_u16(&mut page[base + PAGE_N_DIR_SLOTS..], 4);
    /// BigEndian::write_u16(&mut page[base + PAGE_N_HEAP..], 0x8003); // compact + 3 records
    /// BigEndian::write_u16(&mut page[base + PAGE_N_RECS..], 1);
    /// BigEndian::write_u64(&mut page[base + PAGE_INDEX_ID..], 100);
    /// BigEndian::write_u16(&mut page[base + PAGE_DIRECTION..], PAGE_RIGHT);
    ///
    /// let hdr = IndexHeader::parse(&page).unwrap();
    /// assert_eq!(hdr.n_dir_slots, 4);
    /// assert!(hdr.is_compact());
    /// assert_eq!(hdr.n_heap(), 3);
    /// assert!(hdr.is_leaf());
    /// assert_eq!(hdr.index_id, 100);
    /// assert_eq!(hdr.direction_name(), "Right");
    /// ```
    pub fn parse(page_data: &[u8]) -> Result<Self, IdbError> {
        let mut c = ByteCursor::at(page_data, FIL_PAGE_DATA)?;
        Ok(IndexHeader {
            n_dir_slots: c.read_u16()?,
            heap_top: c.read_u16()?,
            n_heap_raw: c.read_u16()?,
            free: c.read_u16()?,
            garbage: c.read_u16()?,
            last_insert: c.read_u16()?,
            direction: c.read_u16()?,
            n_direction: c.read_u16()?,
            n_recs: c.read_u16()?,
            max_trx_id: c.read_u64()?,
            level: c.read_u16()?,
            index_id: c.read_u64()?,
        })
    }

    /// Returns the actual number of records in the heap (masking out the compact flag).
    pub fn n_heap(&self) -> u16 {
        self.n_heap_raw & 0x7FFF
    }

    /// Returns true if this page uses the new compact row format.
    pub fn is_compact(&self) -> bool {
        (self.n_heap_raw & 0x8000) != 0
    }

    /// Returns a human-readable description of the insert direction.
    pub fn direction_name(&self) -> &'static str {
        match self.direction {
            PAGE_LEFT => "Left",
            PAGE_RIGHT => "Right",
            PAGE_SAME_REC => "Same Record",
            PAGE_SAME_PAGE => "Same Page",
            PAGE_NO_DIRECTION => "No Direction",
            _ => "Unknown",
        }
    }

    /// Returns true if this is a leaf-level page.
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }
}

/// FSEG (File Segment) header pointer (10 bytes each).
///
/// There are two FSEG headers per INDEX page: one for the leaf segment
/// and one for the non-leaf (internal) segment. Only the root page's
/// headers are meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FsegHeader {
    /// Space ID of the inode.
    pub space_id: u32,
    /// Page number of the inode.
    pub page_no: u32,
    /// Byte offset of the inode within the page.
    pub offset: u16,
}

impl FsegHeader {
    fn read(c: &mut ByteCursor<'_>) -> Result<Self, IdbError> {
        Ok(FsegHeader {
            space_id: c.read_u32()?,
            page_no: c.read_u32()?,
            offset: c.read_u16()?,
        })
    }
}

/// A structurally validated INDEX page.
#[derive(Debug, Clone, Serialize)]
pub struct IndexPage {
    pub page_number: u32,
    pub header: IndexHeader,
    pub leaf_segment: FsegHeader,
    pub internal_segment: FsegHeader,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    /// Record origins owned by each directory slot, in ascending key order.
    /// Slot 0 is the infimum, the last slot is the supremum.
    pub dir_slots: Vec<u16>,
}

impl IndexPage {
    /// Decode and validate an INDEX (or SDI index) page.
    ///
    /// Fails with [`IdbError::Unsupported`] for redundant-format pages and
    /// with [`IdbError::CorruptPage`] when the system records or directory
    /// are malformed.
    pub fn parse(page: &Page) -> Result<Self, IdbError> {
        let number = page.number();
        match page.page_type() {
            PageType::Index | PageType::Sdi => {}
            other => {
                return Err(IdbError::corrupt(
                    number,
                    format!("expected INDEX page, found {}", other),
                ))
            }
        }

        let data = page.data();
        let header = IndexHeader::parse(data)?;
        if !header.is_compact() {
            return Err(IdbError::Unsupported(format!(
                "page {} uses the redundant row format",
                number
            )));
        }

        let mut c = page.cursor_at(FIL_PAGE_DATA + INDEX_HEADER_SIZE)?;
        let leaf_segment = FsegHeader::read(&mut c)?;
        let internal_segment = FsegHeader::read(&mut c)?;

        if &data[PAGE_NEW_INFIMUM..PAGE_NEW_INFIMUM + 8] != INFIMUM_LITERAL {
            return Err(IdbError::corrupt(number, "infimum record literal mismatch"));
        }
        if &data[PAGE_NEW_SUPREMUM..PAGE_NEW_SUPREMUM_END] != SUPREMUM_LITERAL {
            return Err(IdbError::corrupt(number, "supremum record literal mismatch"));
        }

        let n_slots = header.n_dir_slots as usize;
        let dir_end = SIZE_PAGE - SIZE_FIL_TRAILER;
        let dir_start = dir_end
            .checked_sub(n_slots * PAGE_DIR_SLOT_SIZE)
            .ok_or_else(|| IdbError::corrupt(number, "directory larger than page"))?;
        if n_slots < 2 || (header.heap_top as usize) > dir_start {
            return Err(IdbError::corrupt(
                number,
                format!(
                    "invalid directory: {} slots, heap top {}",
                    n_slots, header.heap_top
                ),
            ));
        }

        // Slots are stored last-to-first, slot 0 nearest the trailer.
        let mut dir_slots = Vec::with_capacity(n_slots);
        for i in 0..n_slots {
            let mut sc = page.cursor_at(dir_end - (i + 1) * PAGE_DIR_SLOT_SIZE)?;
            let origin = sc.read_u16()?;
            if (origin as usize) < PAGE_NEW_INFIMUM || (origin as usize) >= dir_start {
                return Err(IdbError::corrupt(
                    number,
                    format!("directory slot {} points outside the heap ({})", i, origin),
                ));
            }
            dir_slots.push(origin);
        }
        if dir_slots[0] as usize != PAGE_NEW_INFIMUM
            || dir_slots[n_slots - 1] as usize != PAGE_NEW_SUPREMUM
        {
            return Err(IdbError::corrupt(
                number,
                "directory does not start at infimum and end at supremum",
            ));
        }

        let fil = page.header();
        Ok(IndexPage {
            page_number: number,
            header,
            leaf_segment,
            internal_segment,
            prev_page: fil.prev(),
            next_page: fil.next(),
            dir_slots,
        })
    }

    pub fn level(&self) -> u16 {
        self.header.level
    }

    pub fn is_leaf(&self) -> bool {
        self.header.is_leaf()
    }

    /// A root page has no siblings at its level.
    pub fn is_root(&self) -> bool {
        self.prev_page.is_none() && self.next_page.is_none()
    }

    /// Number of user records declared by the page header.
    pub fn n_recs(&self) -> usize {
        self.header.n_recs as usize
    }

    /// Bytes occupied by live data: heap plus trailer plus directory, less garbage.
    pub fn used_bytes(&self) -> usize {
        (self.header.heap_top as usize
            + SIZE_FIL_TRAILER
            + self.dir_slots.len() * PAGE_DIR_SLOT_SIZE)
            .saturating_sub(self.header.garbage as usize)
    }

    /// `used_bytes` as a fraction of the page size.
    pub fn fill_ratio(&self) -> f64 {
        self.used_bytes() as f64 / SIZE_PAGE as f64
    }

    /// Upper bound on record-chain steps from infimum to supremum.
    pub(crate) fn max_chain_steps(&self) -> usize {
        self.header.n_heap() as usize + 2
    }
}
