//! Tablespace file access.
//!
//! Provides [`Tablespace`], which owns the open file handle (or an in-memory
//! image) and maps page numbers to byte ranges. A page `n` occupies
//! `[n * 16384, (n + 1) * 16384)`. [`Tablespace::load_page`] reads and frames
//! a full page; [`Tablespace::load_page_header`] reads only the 38-byte FIL
//! header into a reusable scratch buffer for metadata-only scans.
//!
//! Reads take `&mut self`: the seek position and the header scratch buffer
//! are per-instance state, so one `Tablespace` serves one caller at a time.
//! Open separate instances to read the same file from several threads.

use std::io::{Cursor, Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::innodb::checksum::validate_checksum;
use crate::innodb::config::ReaderConfig;
use crate::innodb::constants::*;
use crate::innodb::page::{FilHeader, Page};
use crate::IdbError;

/// Supertrait combining `Read + Seek` for type-erased readers.
pub(crate) trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Anything that can hand out framed pages by number.
///
/// Implemented by [`Tablespace`]; the record codec depends on this trait to
/// follow overflow chains, which keeps it testable against in-memory pages.
pub trait PageSource {
    /// Load and frame page `page_num`.
    fn load_page(&mut self, page_num: u32) -> Result<Page, IdbError>;
}

/// An open InnoDB tablespace file (.ibd) or in-memory tablespace image.
pub struct Tablespace {
    reader: Box<dyn ReadSeek>,
    file_size: u64,
    page_count: u64,
    verify_checksums: bool,
    header_buf: [u8; SIZE_FIL_HEAD],
}

impl Tablespace {
    /// Open a tablespace file.
    ///
    /// Unless `config.validate_file_size` is off, the file length must be an
    /// exact multiple of the page size.
    pub fn open<P: AsRef<std::path::Path>>(
        path: P,
        config: &ReaderConfig,
    ) -> Result<Self, IdbError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| IdbError::Io(format!("Cannot open {}: {}", path.display(), e)))?;

        let file_size = file
            .metadata()
            .map_err(|e| IdbError::Io(format!("Cannot stat {}: {}", path.display(), e)))?
            .len();

        debug!(path = %path.display(), file_size, "opening tablespace");
        Self::init(Box::new(file), file_size, config)
    }

    /// Create a tablespace from an in-memory image.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::config::ReaderConfig;
    /// use idbq::innodb::tablespace::Tablespace;
    ///
    /// let ts = Tablespace::from_bytes(vec![0u8; 16384 * 2], &ReaderConfig::default()).unwrap();
    /// assert_eq!(ts.num_of_pages(), 2);
    ///
    /// // A torn last page is rejected unless the size check is disabled
    /// assert!(Tablespace::from_bytes(vec![0u8; 20000], &ReaderConfig::default()).is_err());
    /// ```
    pub fn from_bytes(data: Vec<u8>, config: &ReaderConfig) -> Result<Self, IdbError> {
        let file_size = data.len() as u64;
        Self::init(Box::new(Cursor::new(data)), file_size, config)
    }

    fn init(
        reader: Box<dyn ReadSeek>,
        file_size: u64,
        config: &ReaderConfig,
    ) -> Result<Self, IdbError> {
        let page_size = SIZE_PAGE as u64;
        if config.validate_file_size && file_size % page_size != 0 {
            return Err(IdbError::Parse(format!(
                "File size {} is not a multiple of the page size {}",
                file_size, page_size
            )));
        }

        Ok(Tablespace {
            reader,
            file_size,
            page_count: file_size / page_size,
            verify_checksums: config.verify_checksums,
            header_buf: [0u8; SIZE_FIL_HEAD],
        })
    }

    /// Number of whole pages in the file.
    pub fn num_of_pages(&self) -> u64 {
        self.page_count
    }

    /// File size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Read the raw bytes of page `page_num` without framing.
    pub fn read_page_raw(&mut self, page_num: u32) -> Result<Vec<u8>, IdbError> {
        self.seek_to(page_num)?;
        let mut buf = vec![0u8; SIZE_PAGE];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| IdbError::Io(format!("Cannot read page {}: {}", page_num, e)))?;
        Ok(buf)
    }

    /// Read, optionally checksum, and frame page `page_num`.
    pub fn load_page(&mut self, page_num: u32) -> Result<Page, IdbError> {
        trace!(page = page_num, "loading page");
        let buf = self.read_page_raw(page_num)?;
        if self.verify_checksums {
            let result = validate_checksum(&buf);
            if !result.valid {
                return Err(IdbError::corrupt(
                    page_num,
                    format!(
                        "checksum mismatch: stored 0x{:08x}, calculated 0x{:08x}",
                        result.stored_checksum, result.calculated_checksum
                    ),
                ));
            }
        }
        Page::parse(page_num, buf)
    }

    /// Read only the 38-byte FIL header of page `page_num`.
    pub fn load_page_header(&mut self, page_num: u32) -> Result<FilHeader, IdbError> {
        self.seek_to(page_num)?;
        self.reader
            .read_exact(&mut self.header_buf)
            .map_err(|e| IdbError::Io(format!("Cannot read header of page {}: {}", page_num, e)))?;
        FilHeader::parse(&self.header_buf)
    }

    fn seek_to(&mut self, page_num: u32) -> Result<(), IdbError> {
        if page_num as u64 >= self.page_count {
            return Err(IdbError::Argument(format!(
                "Page {} out of range (tablespace has {} pages)",
                page_num, self.page_count
            )));
        }
        let offset = page_num as u64 * SIZE_PAGE as u64;
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| IdbError::Io(format!("Cannot seek to page {}: {}", page_num, e)))?;
        Ok(())
    }
}

impl PageSource for Tablespace {
    fn load_page(&mut self, page_num: u32) -> Result<Page, IdbError> {
        Tablespace::load_page(self, page_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::innodb::page_types::PageType;
    use byteorder::{BigEndian, ByteOrder};

    fn image(pages: u32) -> Vec<u8> {
        let mut data = vec![0u8; SIZE_PAGE * pages as usize];
        for n in 0..pages {
            let base = n as usize * SIZE_PAGE;
            BigEndian::write_u32(&mut data[base + FIL_PAGE_OFFSET..], n);
            BigEndian::write_u64(&mut data[base + FIL_PAGE_LSN..], 100 + n as u64);
            BigEndian::write_u16(&mut data[base + FIL_PAGE_TYPE..], 17855);
            BigEndian::write_u32(&mut data[base + SIZE_PAGE - 4..], 100 + n);
        }
        data
    }

    #[test]
    fn test_page_count_and_load() {
        let mut ts = Tablespace::from_bytes(image(3), &ReaderConfig::default()).unwrap();
        assert_eq!(ts.num_of_pages(), 3);
        let page = ts.load_page(2).unwrap();
        assert_eq!(page.header().page_number, 2);
        assert_eq!(page.header().lsn, 102);
    }

    #[test]
    fn test_header_only_load() {
        let mut ts = Tablespace::from_bytes(image(2), &ReaderConfig::default()).unwrap();
        let hdr = ts.load_page_header(1).unwrap();
        assert_eq!(hdr.page_number, 1);
        assert_eq!(hdr.page_type, PageType::Index);
    }

    #[test]
    fn test_out_of_range() {
        let mut ts = Tablespace::from_bytes(image(1), &ReaderConfig::default()).unwrap();
        assert!(matches!(ts.load_page(1), Err(IdbError::Argument(_))));
    }

    #[test]
    fn test_size_check_can_be_skipped() {
        let mut data = image(1);
        data.extend_from_slice(&[0u8; 100]);
        let cfg = ReaderConfig {
            validate_file_size: false,
            ..ReaderConfig::default()
        };
        let ts = Tablespace::from_bytes(data, &cfg).unwrap();
        assert_eq!(ts.num_of_pages(), 1);
    }

    #[test]
    fn test_checksum_verification() {
        let mut data = image(1);
        BigEndian::write_u32(&mut data[0..], 0x0BAD_0BAD);
        let cfg = ReaderConfig {
            verify_checksums: true,
            ..ReaderConfig::default()
        };
        let mut ts = Tablespace::from_bytes(data, &cfg).unwrap();
        assert!(matches!(
            ts.load_page(0),
            Err(IdbError::CorruptPage { page: 0, .. })
        ));
    }
}
