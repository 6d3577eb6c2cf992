//! Page framing: FIL header and trailer.
//!
//! Every InnoDB page begins with a 38-byte FIL header ([`FilHeader`]) holding
//! the checksum, page number, prev/next sibling pointers, LSN, page type, flush
//! LSN and space ID. The last 8 bytes form the FIL trailer ([`FilTrailer`])
//! with the old-style checksum and the low 32 bits of the LSN.
//!
//! [`Page::parse`] frames a page-sized buffer: it decodes both ends, rejects
//! pages whose trailer LSN disagrees with the header, and hands out cursors
//! positioned at the start of the body (byte 38) for the format decoders.

use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::cursor::ByteCursor;
use crate::innodb::page_types::PageType;
use crate::IdbError;

/// Parsed FIL header (38 bytes, present at the start of every InnoDB page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilHeader {
    /// Checksum. Bytes 0-3.
    pub checksum: u32,
    /// Page number within the tablespace. Bytes 4-7.
    pub page_number: u32,
    /// Previous page in the sibling list, FIL_NULL if absent. Bytes 8-11.
    pub prev_page: u32,
    /// Next page in the sibling list, FIL_NULL if absent. Bytes 12-15.
    pub next_page: u32,
    /// LSN of newest modification to this page. Bytes 16-23.
    pub lsn: u64,
    /// Page type. Bytes 24-25.
    pub page_type: PageType,
    /// Flush LSN (only meaningful for page 0 of the system tablespace). Bytes 26-33.
    pub flush_lsn: u64,
    /// Space ID this page belongs to. Bytes 34-37.
    pub space_id: u32,
}

impl FilHeader {
    /// Parse a FIL header from the start of `data`.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::page::FilHeader;
    /// use idbq::innodb::page_types::PageType;
    /// use byteorder::{BigEndian, ByteOrder};
    ///
    /// let mut buf = vec![0u8; 38];
    /// BigEndian::write_u32(&mut buf[4..], 3);
    /// BigEndian::write_u32(&mut buf[8..], 0xFFFFFFFF);
    /// BigEndian::write_u32(&mut buf[12..], 4);
    /// BigEndian::write_u16(&mut buf[24..], 17855);
    ///
    /// let hdr = FilHeader::parse(&buf).unwrap();
    /// assert_eq!(hdr.page_number, 3);
    /// assert_eq!(hdr.prev(), None);
    /// assert_eq!(hdr.next(), Some(4));
    /// assert_eq!(hdr.page_type, PageType::Index);
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self, IdbError> {
        let mut c = ByteCursor::new(data);
        Ok(FilHeader {
            checksum: c.read_u32()?,
            page_number: c.read_u32()?,
            prev_page: c.read_u32()?,
            next_page: c.read_u32()?,
            lsn: c.read_u64()?,
            page_type: PageType::from_u16(c.read_u16()?),
            flush_lsn: c.read_u64()?,
            space_id: c.read_u32()?,
        })
    }

    /// Previous sibling page, if linked.
    pub fn prev(&self) -> Option<u32> {
        (self.prev_page != FIL_NULL).then_some(self.prev_page)
    }

    /// Next sibling page, if linked.
    pub fn next(&self) -> Option<u32> {
        (self.next_page != FIL_NULL).then_some(self.next_page)
    }
}

/// Parsed FIL trailer (8 bytes, present at the end of every InnoDB page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilTrailer {
    /// Old-style checksum. Bytes 0-3 of trailer.
    pub checksum: u32,
    /// Low 32 bits of the LSN. Bytes 4-7 of trailer.
    pub lsn_low32: u32,
}

impl FilTrailer {
    /// Parse a FIL trailer from the last 8 bytes of a page.
    pub fn parse(data: &[u8]) -> Result<Self, IdbError> {
        let mut c = ByteCursor::new(data);
        Ok(FilTrailer {
            checksum: c.read_u32()?,
            lsn_low32: c.read_u32()?,
        })
    }
}

/// A framed page: raw bytes plus validated header and trailer.
#[derive(Debug, Clone)]
pub struct Page {
    number: u32,
    header: FilHeader,
    trailer: FilTrailer,
    data: Vec<u8>,
}

impl Page {
    /// Frame a page-sized buffer read for page `number`.
    ///
    /// Fails with [`IdbError::CorruptPage`] if the buffer is not exactly one
    /// page long or if the trailer's low-32 LSN disagrees with the header.
    pub fn parse(number: u32, data: Vec<u8>) -> Result<Self, IdbError> {
        if data.len() != SIZE_PAGE {
            return Err(IdbError::corrupt(
                number,
                format!("page buffer is {} bytes, expected {}", data.len(), SIZE_PAGE),
            ));
        }
        let header = FilHeader::parse(&data)?;
        let trailer = FilTrailer::parse(&data[SIZE_PAGE - SIZE_FIL_TRAILER..])?;
        if (header.lsn & 0xFFFF_FFFF) as u32 != trailer.lsn_low32 {
            return Err(IdbError::corrupt(
                number,
                format!(
                    "LSN mismatch: header low32 0x{:08x}, trailer 0x{:08x}",
                    header.lsn as u32, trailer.lsn_low32
                ),
            ));
        }
        Ok(Page {
            number,
            header,
            trailer,
            data,
        })
    }

    /// Page number this page was loaded as.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn header(&self) -> &FilHeader {
        &self.header
    }

    pub fn trailer(&self) -> &FilTrailer {
        &self.trailer
    }

    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }

    /// The full page buffer, header and trailer included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The page body between the FIL header and trailer.
    pub fn body(&self) -> &[u8] {
        &self.data[FIL_PAGE_DATA..SIZE_PAGE - SIZE_FIL_TRAILER]
    }

    /// Cursor over the whole page, positioned at the start of the body.
    pub fn body_cursor(&self) -> ByteCursor<'_> {
        // Parsed pages are always SIZE_PAGE long
        ByteCursor::clamped(&self.data, FIL_PAGE_DATA)
    }

    /// Cursor over the whole page, positioned at `pos`.
    pub fn cursor_at(&self, pos: usize) -> Result<ByteCursor<'_>, IdbError> {
        ByteCursor::at(&self.data, pos)
    }

    /// Fail unless this page has the expected type.
    pub fn expect_type(&self, expected: PageType) -> Result<(), IdbError> {
        if self.page_type() != expected {
            return Err(IdbError::corrupt(
                self.number,
                format!("expected {} page, found {}", expected, self.page_type()),
            ));
        }
        Ok(())
    }

    /// Consume the page and return its buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    fn make_page(page_num: u32, lsn: u64, trailer_lsn: u32) -> Vec<u8> {
        let mut buf = vec![0u8; SIZE_PAGE];
        BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_OR_CHKSUM..], 0x12345678);
        BigEndian::write_u32(&mut buf[FIL_PAGE_OFFSET..], page_num);
        BigEndian::write_u32(&mut buf[FIL_PAGE_PREV..], 41);
        BigEndian::write_u32(&mut buf[FIL_PAGE_NEXT..], FIL_NULL);
        BigEndian::write_u64(&mut buf[FIL_PAGE_LSN..], lsn);
        BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], 17855);
        BigEndian::write_u64(&mut buf[FIL_PAGE_FILE_FLUSH_LSN..], 2000);
        BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_ID..], 5);
        BigEndian::write_u32(&mut buf[SIZE_PAGE - 4..], trailer_lsn);
        buf
    }

    #[test]
    fn test_fil_header_parse() {
        let data = make_page(42, 0x1_0000_03E8, 0x3E8);
        let hdr = FilHeader::parse(&data).unwrap();
        assert_eq!(hdr.checksum, 0x12345678);
        assert_eq!(hdr.page_number, 42);
        assert_eq!(hdr.prev(), Some(41));
        assert_eq!(hdr.next(), None);
        assert_eq!(hdr.lsn, 0x1_0000_03E8);
        assert_eq!(hdr.page_type, PageType::Index);
        assert_eq!(hdr.flush_lsn, 2000);
        assert_eq!(hdr.space_id, 5);
    }

    #[test]
    fn test_fil_header_too_short() {
        let data = vec![0u8; 10];
        assert!(matches!(
            FilHeader::parse(&data),
            Err(IdbError::Bounds { .. })
        ));
    }

    #[test]
    fn test_page_frame_matches_low32_lsn() {
        let page = Page::parse(42, make_page(42, 0x1_0000_03E8, 0x3E8)).unwrap();
        assert_eq!(page.number(), 42);
        assert_eq!(page.trailer().lsn_low32, 0x3E8);
        assert_eq!(page.body_cursor().position(), FIL_PAGE_DATA);
        assert_eq!(page.body().len(), SIZE_PAGE - SIZE_FIL_HEAD - SIZE_FIL_TRAILER);
    }

    #[test]
    fn test_page_frame_rejects_lsn_mismatch() {
        let err = Page::parse(7, make_page(7, 1000, 999)).unwrap_err();
        assert!(matches!(err, IdbError::CorruptPage { page: 7, .. }));
    }

    #[test]
    fn test_page_frame_rejects_short_buffer() {
        assert!(Page::parse(0, vec![0u8; 100]).is_err());
    }

    #[test]
    fn test_all_zero_page_frames() {
        let page = Page::parse(9, vec![0u8; SIZE_PAGE]).unwrap();
        assert_eq!(page.page_type(), PageType::Allocated);
        assert!(page.expect_type(PageType::Index).is_err());
    }
}
