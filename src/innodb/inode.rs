//! File segment inode pages.
//!
//! An `INODE` page (type 3) holds up to 85 segment descriptors after a 12-byte
//! list node linking it into the space's full/free inode lists. Each entry
//! names a segment id, the three extent lists the segment owns and a 32-slot
//! array of individually allocated fragment pages. A valid entry always
//! carries the magic number 97937874.

use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::cursor::ByteCursor;
use crate::innodb::fsp::{ListBaseNode, ListNode};
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::IdbError;

/// One 192-byte segment inode.
#[derive(Debug, Clone, Serialize)]
pub struct InodeEntry {
    /// Slot index within the page.
    pub slot: usize,
    pub segment_id: u64,
    /// Used pages in the `not_full` extent list.
    pub not_full_n_used: u32,
    pub free: ListBaseNode,
    pub not_full: ListBaseNode,
    pub full: ListBaseNode,
    pub magic: u32,
    /// Fragment pages owned directly by the segment. Empty slots are skipped.
    pub frag_pages: Vec<u32>,
}

impl InodeEntry {
    fn read(c: &mut ByteCursor<'_>, slot: usize) -> Result<Self, IdbError> {
        let segment_id = c.read_u64()?;
        let not_full_n_used = c.read_u32()?;
        let free = ListBaseNode::read(c)?;
        let not_full = ListBaseNode::read(c)?;
        let full = ListBaseNode::read(c)?;
        let magic = c.read_u32()?;
        let mut frag_pages = Vec::new();
        for _ in 0..FSEG_FRAG_ARR_N_SLOTS {
            let p = c.read_u32()?;
            if p != FIL_NULL {
                frag_pages.push(p);
            }
        }
        Ok(InodeEntry {
            slot,
            segment_id,
            not_full_n_used,
            free,
            not_full,
            full,
            magic,
            frag_pages,
        })
    }

    /// Number of extents held in the three extent lists.
    pub fn extent_count(&self) -> u32 {
        self.free.len + self.not_full.len + self.full.len
    }
}

/// Decoded `INODE` page.
#[derive(Debug, Clone, Serialize)]
pub struct InodePage {
    /// Link in the space's inode page list.
    pub list_node: ListNode,
    /// Entries in slot order, up to the first unused slot.
    pub entries: Vec<InodeEntry>,
}

impl InodePage {
    /// Decode an `INODE` page.
    ///
    /// Scanning stops at the first slot with a zero segment id or zero magic.
    /// A used slot whose magic is not the inode marker fails with
    /// [`IdbError::CorruptPage`].
    pub fn parse(page: &Page) -> Result<Self, IdbError> {
        page.expect_type(PageType::Inode)?;
        let mut c = page.body_cursor();
        let list_node = ListNode::read(&mut c)?;

        let mut entries = Vec::new();
        for slot in 0..FSEG_INODES_PER_PAGE {
            c.set_position(FSEG_ARR_OFFSET + slot * FSEG_INODE_SIZE)?;
            let entry = InodeEntry::read(&mut c, slot)?;
            if entry.segment_id == 0 || entry.magic == 0 {
                break;
            }
            if entry.magic != FSEG_MAGIC_N_VALUE {
                return Err(IdbError::corrupt(
                    page.number(),
                    format!(
                        "inode slot {} has magic {} (segment {})",
                        slot, entry.magic, entry.segment_id
                    ),
                ));
            }
            entries.push(entry);
        }

        Ok(InodePage { list_node, entries })
    }
}
