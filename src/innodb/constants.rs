/// InnoDB page and file structure constants.
///
/// These values are derived from the MySQL/InnoDB source code headers:
/// - fil0fil.h (FIL header/trailer)
/// - page0page.h (page header)
/// - fsp0fsp.h (FSP header, extent descriptors, inodes)
/// - btr0types.h / rem0rec.h (records and external fields)
// Page size (uncompressed tablespaces only)
pub const SIZE_PAGE: usize = 16384;

// FIL Header (38 bytes total)
pub const SIZE_FIL_HEAD: usize = 38;
pub const FIL_PAGE_SPACE_OR_CHKSUM: usize = 0; // 4 bytes - checksum
pub const FIL_PAGE_OFFSET: usize = 4; // 4 bytes - page number
pub const FIL_PAGE_PREV: usize = 8; // 4 bytes - previous page
pub const FIL_PAGE_NEXT: usize = 12; // 4 bytes - next page
pub const FIL_PAGE_LSN: usize = 16; // 8 bytes - LSN of newest modification
pub const FIL_PAGE_TYPE: usize = 24; // 2 bytes - page type
pub const FIL_PAGE_FILE_FLUSH_LSN: usize = 26; // 8 bytes - flush LSN
pub const FIL_PAGE_SPACE_ID: usize = 34; // 4 bytes - space id

// FIL Trailer (8 bytes total): old-style checksum + low 32 bits of LSN
pub const SIZE_FIL_TRAILER: usize = 8;

// Start of page data (immediately after FIL header)
pub const FIL_PAGE_DATA: usize = 38;

// "null" page reference
pub const FIL_NULL: u32 = 0xFFFFFFFF;

// FSP Header (112 bytes, starts at FIL_PAGE_DATA on page 0)
pub const FSP_HEADER_SIZE: usize = 112;
pub const FSP_SPACE_ID: usize = 0;
pub const FSP_SIZE: usize = 8;
pub const FSP_FREE_LIMIT: usize = 12;
pub const FSP_SPACE_FLAGS: usize = 16;
pub const FSP_FRAG_N_USED: usize = 20;
pub const FSP_FREE: usize = 24; // list base node (16 bytes)
pub const FSP_FREE_FRAG: usize = 40;
pub const FSP_FULL_FRAG: usize = 56;
pub const FSP_SEG_ID: usize = 72; // 8 bytes - next unused segment id
pub const FSP_SEG_INODES_FULL: usize = 80;
pub const FSP_SEG_INODES_FREE: usize = 96;

// File list base node / node sizes
pub const FLST_BASE_NODE_SIZE: usize = 16;
pub const FLST_NODE_SIZE: usize = 12;

// Extent descriptors (XDES), 40 bytes each, array follows the FSP header
pub const XDES_ARR_OFFSET: usize = FIL_PAGE_DATA + FSP_HEADER_SIZE;
pub const XDES_SIZE: usize = 40;
pub const XDES_ID: usize = 0; // 8 bytes - owning segment id
pub const XDES_FLST_NODE: usize = 8; // 12 bytes - list node
pub const XDES_STATE: usize = 20; // 4 bytes
pub const XDES_BITMAP: usize = 24; // 16 bytes (2 bits per page)
pub const XDES_BITMAP_SIZE: usize = 16;
pub const XDES_PER_PAGE: usize = 256;

// Segment inodes, 192 bytes each, after a 12-byte list node
pub const FSEG_ARR_OFFSET: usize = FIL_PAGE_DATA + FLST_NODE_SIZE;
pub const FSEG_INODE_SIZE: usize = 192;
pub const FSEG_INODES_PER_PAGE: usize = 85;
pub const FSEG_ID: usize = 0; // 8 bytes
pub const FSEG_NOT_FULL_N_USED: usize = 8; // 4 bytes
pub const FSEG_FREE: usize = 12; // list base node
pub const FSEG_NOT_FULL: usize = 28;
pub const FSEG_FULL: usize = 44;
pub const FSEG_MAGIC_N: usize = 60; // 4 bytes
pub const FSEG_FRAG_ARR: usize = 64; // 32 x 4-byte page numbers
pub const FSEG_FRAG_ARR_N_SLOTS: usize = 32;
pub const FSEG_MAGIC_N_VALUE: u32 = 97937874;

// Page Header (INDEX page specific, starts at FIL_PAGE_DATA = offset 38)
pub const PAGE_N_DIR_SLOTS: usize = 0; // 2 bytes - number of directory slots
pub const PAGE_HEAP_TOP: usize = 2; // 2 bytes - pointer to record heap top
pub const PAGE_N_HEAP: usize = 4; // 2 bytes - records in heap (bit 15 = compact flag)
pub const PAGE_FREE: usize = 6; // 2 bytes - pointer to start of free record list
pub const PAGE_GARBAGE: usize = 8; // 2 bytes - bytes in deleted records
pub const PAGE_LAST_INSERT: usize = 10; // 2 bytes - pointer to last inserted record
pub const PAGE_DIRECTION: usize = 12; // 2 bytes - last insert direction
pub const PAGE_N_DIRECTION: usize = 14; // 2 bytes - consecutive inserts in same direction
pub const PAGE_N_RECS: usize = 16; // 2 bytes - number of user records
pub const PAGE_MAX_TRX_ID: usize = 18; // 8 bytes - max trx id
pub const PAGE_LEVEL: usize = 26; // 2 bytes - level in B+tree (0 = leaf)
pub const PAGE_INDEX_ID: usize = 28; // 8 bytes - index id
pub const INDEX_HEADER_SIZE: usize = 36;

// FSEG Header size (leaf + non-leaf follow the INDEX header)
pub const FSEG_HEADER_SIZE: usize = 10;

// Record extra bytes (compact format)
pub const REC_N_NEW_EXTRA_BYTES: usize = 5;

// System records: PAGE_DATA = 38 + 36 + 2 * 10 = 94
pub const PAGE_DATA_OFFSET: usize = FIL_PAGE_DATA + INDEX_HEADER_SIZE + 2 * FSEG_HEADER_SIZE;
pub const PAGE_NEW_INFIMUM: usize = PAGE_DATA_OFFSET + REC_N_NEW_EXTRA_BYTES; // 99
pub const PAGE_NEW_SUPREMUM: usize = PAGE_DATA_OFFSET + 2 * REC_N_NEW_EXTRA_BYTES + 8; // 112
pub const PAGE_NEW_SUPREMUM_END: usize = PAGE_NEW_SUPREMUM + 8; // 120
pub const INFIMUM_LITERAL: &[u8; 8] = b"infimum\0";
pub const SUPREMUM_LITERAL: &[u8; 8] = b"supremum";

// Page directory
pub const PAGE_DIR_SLOT_SIZE: usize = 2;

// Hidden system columns
pub const DATA_ROW_ID_LEN: usize = 6;
pub const DATA_TRX_ID_LEN: usize = 6;
pub const DATA_ROLL_PTR_LEN: usize = 7;
pub const REC_NODE_PTR_SIZE: usize = 4;

// Externally stored fields
pub const BTR_EXTERN_FIELD_REF_SIZE: usize = 20;
pub const BTR_EXTERN_SPACE_ID: usize = 0;
pub const BTR_EXTERN_PAGE_NO: usize = 4;
pub const BTR_EXTERN_OFFSET: usize = 8;
pub const BTR_EXTERN_LEN: usize = 12; // 8 bytes, low 4 hold the length
pub const BTR_EXTERN_OWNER_FLAG: u8 = 128;
pub const BTR_EXTERN_INHERITED_FLAG: u8 = 64;
pub const REC_ANTELOPE_MAX_INDEX_COL_LEN: usize = 768;

// Old-style BLOB page header, relative to the pointer's byte offset
pub const LOB_HDR_PART_LEN: usize = 0;
pub const LOB_HDR_NEXT_PAGE_NO: usize = 4;
pub const LOB_HDR_SIZE: usize = 8;

// Default location of the clustered index root in a file-per-table tablespace
pub const FIRST_ROOT_PAGE: u32 = 3;

// Checksum constants
pub const BUF_NO_CHECKSUM_MAGIC: u32 = 0xDEADBEEF;
pub const UT_HASH_RANDOM_MASK: u32 = 1463735687;
pub const UT_HASH_RANDOM_MASK2: u32 = 1653893711;

// Insert direction values
pub const PAGE_LEFT: u16 = 1;
pub const PAGE_RIGHT: u16 = 2;
pub const PAGE_SAME_REC: u16 = 3;
pub const PAGE_SAME_PAGE: u16 = 4;
pub const PAGE_NO_DIRECTION: u16 = 5;
