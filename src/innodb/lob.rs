//! Externally stored column values.
//!
//! When a record is too large for its page, InnoDB moves the tail of long
//! variable-length columns onto dedicated overflow pages. The record keeps a
//! (possibly empty) inline prefix followed by a 20-byte [`OverflowPointer`].
//! Old-style BLOB pages (type 10) carry an 8-byte header ([`BlobPage`]) with
//! the payload length on this page and the next page in the chain, followed
//! by the payload itself. [`read_external`] walks the chain.
//!
//! MySQL 8.0 LOB first/index/data pages and compressed BLOB pages are
//! rejected with [`IdbError::Unsupported`].

use std::collections::HashSet;

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;
use tracing::trace;

use crate::innodb::constants::*;
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::innodb::tablespace::PageSource;
use crate::IdbError;

/// The 20-byte reference stored in a record for an external field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverflowPointer {
    pub space_id: u32,
    /// First overflow page.
    pub page_no: u32,
    /// Byte offset of the BLOB header within the first page.
    pub offset: u32,
    /// Length of the externally stored part.
    pub length: u64,
    /// The record owns the external field.
    pub owner: bool,
    /// The field was inherited from an earlier version by an update.
    pub inherited: bool,
}

impl OverflowPointer {
    /// Parse a pointer from exactly the 20 bytes at the end of an external field.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::lob::OverflowPointer;
    /// use byteorder::{BigEndian, ByteOrder};
    ///
    /// let mut raw = [0u8; 20];
    /// BigEndian::write_u32(&mut raw[4..], 7);     // page
    /// BigEndian::write_u32(&mut raw[8..], 38);    // offset
    /// BigEndian::write_u32(&mut raw[16..], 5000); // length
    ///
    /// let ptr = OverflowPointer::parse(&raw).unwrap();
    /// assert_eq!(ptr.page_no, 7);
    /// assert_eq!(ptr.length, 5000);
    /// assert!(ptr.owner);
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self, IdbError> {
        if data.len() != BTR_EXTERN_FIELD_REF_SIZE {
            return Err(IdbError::Bounds {
                offset: 0,
                len: BTR_EXTERN_FIELD_REF_SIZE,
                size: data.len(),
            });
        }
        let flags = data[BTR_EXTERN_LEN];
        Ok(OverflowPointer {
            space_id: BigEndian::read_u32(&data[BTR_EXTERN_SPACE_ID..]),
            page_no: BigEndian::read_u32(&data[BTR_EXTERN_PAGE_NO..]),
            offset: BigEndian::read_u32(&data[BTR_EXTERN_OFFSET..]),
            length: BigEndian::read_u32(&data[BTR_EXTERN_LEN + 4..]) as u64,
            owner: flags & BTR_EXTERN_OWNER_FLAG == 0,
            inherited: flags & BTR_EXTERN_INHERITED_FLAG != 0,
        })
    }
}

/// Decoded old-style BLOB page header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobPage {
    pub page_number: u32,
    /// Offset of the BLOB header within the page.
    pub offset: usize,
    /// Number of payload bytes stored on this page.
    pub part_len: u32,
    /// Next page in the chain, `None` at the end.
    pub next_page: Option<u32>,
}

impl BlobPage {
    /// Parse the BLOB header at `offset` (FIL_PAGE_DATA for standalone pages).
    pub fn parse(page: &Page, offset: usize) -> Result<Self, IdbError> {
        match page.page_type() {
            PageType::Blob | PageType::SdiBlob => {}
            t if t.is_transformed() || is_unsupported_lob(t) => {
                return Err(IdbError::Unsupported(format!(
                    "page {} is a {} page",
                    page.number(),
                    t
                )))
            }
            other => {
                return Err(IdbError::corrupt(
                    page.number(),
                    format!("expected BLOB page, found {}", other),
                ))
            }
        }

        let mut c = page.cursor_at(offset)?;
        let part_len = c.read_u32()?;
        let next = c.read_u32()?;
        let blob = BlobPage {
            page_number: page.number(),
            offset,
            part_len,
            next_page: (next != FIL_NULL).then_some(next),
        };
        if blob.payload_range().end > SIZE_PAGE - SIZE_FIL_TRAILER {
            return Err(IdbError::corrupt(
                page.number(),
                format!("BLOB part of {} bytes overruns the page", part_len),
            ));
        }
        Ok(blob)
    }

    fn payload_range(&self) -> std::ops::Range<usize> {
        let start = self.offset + LOB_HDR_SIZE;
        start..start + self.part_len as usize
    }

    /// The payload bytes of this page.
    pub fn payload<'p>(&self, page: &'p Page) -> &'p [u8] {
        &page.data()[self.payload_range()]
    }
}

fn is_unsupported_lob(t: PageType) -> bool {
    matches!(
        t,
        PageType::ZBlob
            | PageType::ZBlob2
            | PageType::LobFirst
            | PageType::LobData
            | PageType::LobIndex
            | PageType::Zlob(_)
            | PageType::SdiZblob
    )
}

/// Assemble an externally stored value by following its BLOB page chain.
///
/// Returns exactly `ptr.length` bytes. A chain that ends early, revisits a
/// page, or points at a non-BLOB page is reported as corruption.
pub fn read_external<S: PageSource + ?Sized>(
    src: &mut S,
    ptr: &OverflowPointer,
) -> Result<Vec<u8>, IdbError> {
    let total = ptr.length as usize;
    // Grown from actual payloads; `ptr.length` may be corrupt
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    let mut page_no = ptr.page_no;
    let mut offset = ptr.offset as usize;

    while out.len() < total {
        if !visited.insert(page_no) {
            return Err(IdbError::corrupt(page_no, "BLOB chain revisits a page"));
        }
        let page = src.load_page(page_no)?;
        let blob = BlobPage::parse(&page, offset)?;
        if blob.part_len == 0 {
            return Err(IdbError::corrupt(page_no, "empty BLOB part in chain"));
        }
        let payload = blob.payload(&page);
        let take = payload.len().min(total - out.len());
        out.extend_from_slice(&payload[..take]);
        trace!(page = page_no, bytes = take, "read BLOB part");

        match blob.next_page {
            Some(next) => {
                page_no = next;
                offset = FIL_PAGE_DATA;
            }
            None => break,
        }
    }

    if out.len() < total {
        return Err(IdbError::corrupt(
            page_no,
            format!(
                "BLOB chain ended after {} of {} bytes",
                out.len(),
                total
            ),
        ));
    }
    Ok(out)
}
