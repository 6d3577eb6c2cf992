//! InnoDB page type registry.
//!
//! Maps the 2-byte page type field (bytes 24-25 of the FIL header) to a
//! [`PageType`]. The type drives which structural decoder
//! [`decode_page`](crate::innodb::decode::decode_page) applies to a page body.
//! Values follow `fil0fil.h` from MySQL 5.7 through 8.x.

use serde::Serialize;
use std::fmt;

/// Page type codes found in the FIL header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageType {
    /// Freshly allocated, type field not initialized (0)
    Allocated,
    /// Undo log page (2)
    UndoLog,
    /// File segment inode (3)
    Inode,
    /// Insert buffer free list (4)
    IbufFreeList,
    /// Insert buffer bitmap (5)
    IbufBitmap,
    /// System internal page (6)
    Sys,
    /// Transaction system header (7)
    TrxSys,
    /// File space header, page 0 of each tablespace (8)
    FspHdr,
    /// Extent descriptor (9)
    Xdes,
    /// Uncompressed BLOB page (10)
    Blob,
    /// First compressed BLOB page (11)
    ZBlob,
    /// Subsequent compressed BLOB page (12)
    ZBlob2,
    /// Compressed page (14)
    Compressed,
    /// Encrypted page (15)
    Encrypted,
    /// Compressed and encrypted page (16)
    CompressedEncrypted,
    /// Encrypted R-tree page (17)
    EncryptedRtree,
    /// Uncompressed SDI BLOB page (18)
    SdiBlob,
    /// Compressed SDI BLOB page (19)
    SdiZblob,
    /// Rollback segment array page (21)
    RsegArray,
    /// LOB index page (22)
    LobIndex,
    /// LOB data page (23)
    LobData,
    /// LOB first page (24)
    LobFirst,
    /// Compressed LOB pages (25-29)
    Zlob(u16),
    /// SDI index page (17853)
    Sdi,
    /// R-tree index page (17854)
    Rtree,
    /// B+Tree index page (17855)
    Index,
    /// Any code not listed above
    Unknown(u16),
}

impl PageType {
    /// Parse a page type from the raw FIL header value.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::page_types::PageType;
    ///
    /// assert_eq!(PageType::from_u16(17855), PageType::Index);
    /// assert_eq!(PageType::from_u16(8), PageType::FspHdr);
    /// assert_eq!(PageType::from_u16(9999), PageType::Unknown(9999));
    /// assert_eq!(PageType::from_u16(9999).as_u16(), 9999);
    /// ```
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => PageType::Allocated,
            2 => PageType::UndoLog,
            3 => PageType::Inode,
            4 => PageType::IbufFreeList,
            5 => PageType::IbufBitmap,
            6 => PageType::Sys,
            7 => PageType::TrxSys,
            8 => PageType::FspHdr,
            9 => PageType::Xdes,
            10 => PageType::Blob,
            11 => PageType::ZBlob,
            12 => PageType::ZBlob2,
            14 => PageType::Compressed,
            15 => PageType::Encrypted,
            16 => PageType::CompressedEncrypted,
            17 => PageType::EncryptedRtree,
            18 => PageType::SdiBlob,
            19 => PageType::SdiZblob,
            21 => PageType::RsegArray,
            22 => PageType::LobIndex,
            23 => PageType::LobData,
            24 => PageType::LobFirst,
            25..=29 => PageType::Zlob(value),
            17853 => PageType::Sdi,
            17854 => PageType::Rtree,
            17855 => PageType::Index,
            other => PageType::Unknown(other),
        }
    }

    /// Raw on-disk value.
    pub fn as_u16(self) -> u16 {
        match self {
            PageType::Allocated => 0,
            PageType::UndoLog => 2,
            PageType::Inode => 3,
            PageType::IbufFreeList => 4,
            PageType::IbufBitmap => 5,
            PageType::Sys => 6,
            PageType::TrxSys => 7,
            PageType::FspHdr => 8,
            PageType::Xdes => 9,
            PageType::Blob => 10,
            PageType::ZBlob => 11,
            PageType::ZBlob2 => 12,
            PageType::Compressed => 14,
            PageType::Encrypted => 15,
            PageType::CompressedEncrypted => 16,
            PageType::EncryptedRtree => 17,
            PageType::SdiBlob => 18,
            PageType::SdiZblob => 19,
            PageType::RsegArray => 21,
            PageType::LobIndex => 22,
            PageType::LobData => 23,
            PageType::LobFirst => 24,
            PageType::Sdi => 17853,
            PageType::Rtree => 17854,
            PageType::Index => 17855,
            PageType::Zlob(v) | PageType::Unknown(v) => v,
        }
    }

    /// MySQL source-style name (e.g. `"INDEX"`, `"FSP_HDR"`).
    pub fn name(self) -> &'static str {
        match self {
            PageType::Allocated => "ALLOCATED",
            PageType::UndoLog => "UNDO_LOG",
            PageType::Inode => "INODE",
            PageType::IbufFreeList => "IBUF_FREE_LIST",
            PageType::IbufBitmap => "IBUF_BITMAP",
            PageType::Sys => "SYS",
            PageType::TrxSys => "TRX_SYS",
            PageType::FspHdr => "FSP_HDR",
            PageType::Xdes => "XDES",
            PageType::Blob => "BLOB",
            PageType::ZBlob => "ZBLOB",
            PageType::ZBlob2 => "ZBLOB2",
            PageType::Compressed => "COMPRESSED",
            PageType::Encrypted => "ENCRYPTED",
            PageType::CompressedEncrypted => "COMPRESSED_ENCRYPTED",
            PageType::EncryptedRtree => "ENCRYPTED_RTREE",
            PageType::SdiBlob => "SDI_BLOB",
            PageType::SdiZblob => "SDI_ZBLOB",
            PageType::RsegArray => "RSEG_ARRAY",
            PageType::LobIndex => "LOB_INDEX",
            PageType::LobData => "LOB_DATA",
            PageType::LobFirst => "LOB_FIRST",
            PageType::Zlob(_) => "ZLOB",
            PageType::Sdi => "SDI",
            PageType::Rtree => "RTREE",
            PageType::Index => "INDEX",
            PageType::Unknown(_) => "UNKNOWN",
        }
    }

    /// Pages whose body can only be read after decompression or decryption.
    pub fn is_transformed(self) -> bool {
        matches!(
            self,
            PageType::Compressed
                | PageType::Encrypted
                | PageType::CompressedEncrypted
                | PageType::EncryptedRtree
        )
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
