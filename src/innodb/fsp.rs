//! File space header and extent descriptor pages.
//!
//! Page 0 of every tablespace (type `FSP_HDR`) starts its body with the
//! 112-byte [`FspHeader`]: space id, size, free limit, flags and the heads of
//! the free/fragment extent lists. An array of 40-byte extent descriptors
//! ([`XdesEntry`]) follows, one per 64-page extent, 256 per page. `XDES`
//! pages repeat the descriptor array every 16,384 pages without the
//! header fields being meaningful.

use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::cursor::ByteCursor;
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::IdbError;

/// A (page, byte offset) address used by on-disk linked lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileAddr {
    pub page: u32,
    pub offset: u16,
}

impl FileAddr {
    pub(crate) fn read(c: &mut ByteCursor<'_>) -> Result<Self, IdbError> {
        Ok(FileAddr {
            page: c.read_u32()?,
            offset: c.read_u16()?,
        })
    }

    /// Returns true if the address points nowhere.
    pub fn is_null(&self) -> bool {
        self.page == FIL_NULL
    }
}

/// Base node of a doubly-linked file list (16 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListBaseNode {
    pub len: u32,
    pub first: FileAddr,
    pub last: FileAddr,
}

impl ListBaseNode {
    pub(crate) fn read(c: &mut ByteCursor<'_>) -> Result<Self, IdbError> {
        Ok(ListBaseNode {
            len: c.read_u32()?,
            first: FileAddr::read(c)?,
            last: FileAddr::read(c)?,
        })
    }
}

/// Node of a doubly-linked file list (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListNode {
    pub prev: FileAddr,
    pub next: FileAddr,
}

impl ListNode {
    pub(crate) fn read(c: &mut ByteCursor<'_>) -> Result<Self, IdbError> {
        Ok(ListNode {
            prev: FileAddr::read(c)?,
            next: FileAddr::read(c)?,
        })
    }
}

/// Parsed FSP header (from page 0 of a tablespace, starts at FIL_PAGE_DATA).
#[derive(Debug, Clone, Serialize)]
pub struct FspHeader {
    pub space_id: u32,
    /// Size of the tablespace in pages.
    pub size: u32,
    /// Minimum page number not yet initialized.
    pub free_limit: u32,
    pub flags: u32,
    /// Number of used pages in the FSP_FREE_FRAG list.
    pub frag_n_used: u32,
    pub free: ListBaseNode,
    pub free_frag: ListBaseNode,
    pub full_frag: ListBaseNode,
    /// First unused segment id.
    pub next_seg_id: u64,
    pub seg_inodes_full: ListBaseNode,
    pub seg_inodes_free: ListBaseNode,
}

impl FspHeader {
    /// Parse the FSP header at the start of the page body.
    pub fn parse(page: &Page) -> Result<Self, IdbError> {
        let mut c = page.body_cursor();
        let space_id = c.read_u32()?;
        c.skip(4)?; // unused
        Ok(FspHeader {
            space_id,
            size: c.read_u32()?,
            free_limit: c.read_u32()?,
            flags: c.read_u32()?,
            frag_n_used: c.read_u32()?,
            free: ListBaseNode::read(&mut c)?,
            free_frag: ListBaseNode::read(&mut c)?,
            full_frag: ListBaseNode::read(&mut c)?,
            next_seg_id: c.read_u64()?,
            seg_inodes_full: ListBaseNode::read(&mut c)?,
            seg_inodes_free: ListBaseNode::read(&mut c)?,
        })
    }
}

/// Extent state stored in each descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum XdesState {
    /// In the space's free list.
    Free,
    /// In the free fragment list.
    FreeFrag,
    /// In the full fragment list.
    FullFrag,
    /// Belongs to a file segment.
    Fseg,
}

impl XdesState {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(XdesState::Free),
            2 => Some(XdesState::FreeFrag),
            3 => Some(XdesState::FullFrag),
            4 => Some(XdesState::Fseg),
            _ => None,
        }
    }
}

/// One 40-byte extent descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct XdesEntry {
    /// Owning segment id (meaningful for `Fseg` extents).
    pub segment_id: u64,
    pub list_node: ListNode,
    pub state: XdesState,
    /// Two bits per page: bit 0 = free, bit 1 = clean.
    pub bitmap: [u8; XDES_BITMAP_SIZE],
}

impl XdesEntry {
    /// Returns true if page `i` (0..64) of the extent is free.
    pub fn is_page_free(&self, i: usize) -> bool {
        let bit = i * 2;
        i < 64 && self.bitmap[bit / 8] & (1 << (bit % 8)) != 0
    }

    /// Number of pages of the extent marked free.
    pub fn free_pages(&self) -> usize {
        (0..64).filter(|&i| self.is_page_free(i)).count()
    }
}

/// Decoded `FSP_HDR` or `XDES` page.
#[derive(Debug, Clone, Serialize)]
pub struct FspHdrPage {
    /// Present on `FSP_HDR` pages only.
    pub header: Option<FspHeader>,
    /// Descriptors up to the first unused slot.
    pub extents: Vec<XdesEntry>,
}

impl FspHdrPage {
    /// Decode an `FSP_HDR` or `XDES` page.
    pub fn parse(page: &Page) -> Result<Self, IdbError> {
        let header = match page.page_type() {
            PageType::FspHdr => Some(FspHeader::parse(page)?),
            PageType::Xdes => None,
            other => {
                return Err(IdbError::corrupt(
                    page.number(),
                    format!("expected FSP_HDR or XDES page, found {}", other),
                ))
            }
        };

        let mut c = page.cursor_at(XDES_ARR_OFFSET)?;
        let mut extents = Vec::new();
        for _ in 0..XDES_PER_PAGE {
            let segment_id = c.read_u64()?;
            let list_node = ListNode::read(&mut c)?;
            let state = match XdesState::from_u32(c.read_u32()?) {
                Some(s) => s,
                None => break,
            };
            let mut bitmap = [0u8; XDES_BITMAP_SIZE];
            bitmap.copy_from_slice(c.read_bytes(XDES_BITMAP_SIZE)?);
            extents.push(XdesEntry {
                segment_id,
                list_node,
                state,
                bitmap,
            });
        }

        Ok(FspHdrPage { header, extents })
    }
}
