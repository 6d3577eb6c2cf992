//! Page checksum validation.
//!
//! InnoDB writes one of several checksums into bytes 0-3 of every page. The
//! reader accepts CRC-32C (MySQL 5.7.7+ default), the legacy fold-based
//! InnoDB checksum, the "none" magic and all-zero freshly allocated pages.
//! Validation is opt-in through
//! [`ReaderConfig::verify_checksums`](crate::innodb::config::ReaderConfig).

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::innodb::constants::*;

/// Checksum algorithm that matched a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChecksumAlgorithm {
    /// CRC-32C over the header and body ranges.
    Crc32c,
    /// Legacy `buf_calc_page_new_checksum` fold.
    InnoDB,
    /// `innodb_checksum_algorithm=none` or an untouched all-zero page.
    None,
}

/// Result of a checksum validation.
#[derive(Debug, Clone, Serialize)]
pub struct ChecksumResult {
    pub algorithm: ChecksumAlgorithm,
    pub valid: bool,
    pub stored_checksum: u32,
    pub calculated_checksum: u32,
}

/// Validate the checksum stored in a full page buffer.
///
/// # Examples
///
/// ```
/// use idbq::innodb::checksum::{validate_checksum, ChecksumAlgorithm};
///
/// let page = vec![0u8; 16384];
/// let result = validate_checksum(&page);
/// assert!(result.valid);
/// assert_eq!(result.algorithm, ChecksumAlgorithm::None);
/// ```
pub fn validate_checksum(page: &[u8]) -> ChecksumResult {
    if page.len() < SIZE_PAGE {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::None,
            valid: false,
            stored_checksum: 0,
            calculated_checksum: 0,
        };
    }

    let stored = BigEndian::read_u32(&page[FIL_PAGE_SPACE_OR_CHKSUM..]);
    let unchecked = |calculated| ChecksumResult {
        algorithm: ChecksumAlgorithm::None,
        valid: true,
        stored_checksum: stored,
        calculated_checksum: calculated,
    };

    if stored == BUF_NO_CHECKSUM_MAGIC {
        return unchecked(BUF_NO_CHECKSUM_MAGIC);
    }
    if stored == 0 && page[..SIZE_PAGE].iter().all(|&b| b == 0) {
        return unchecked(0);
    }

    let crc = crc32c_checksum(page);
    if stored == crc {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::Crc32c,
            valid: true,
            stored_checksum: stored,
            calculated_checksum: crc,
        };
    }

    let legacy = legacy_checksum(page);
    ChecksumResult {
        algorithm: if stored == legacy {
            ChecksumAlgorithm::InnoDB
        } else {
            ChecksumAlgorithm::Crc32c
        },
        valid: stored == legacy,
        stored_checksum: stored,
        calculated_checksum: if stored == legacy { legacy } else { crc },
    }
}

/// CRC-32C over bytes 4..26 and 38..(page_size - 8).
///
/// The flush LSN, space id, checksum field and trailer are excluded because
/// they are written outside the buffer pool.
pub fn crc32c_checksum(page: &[u8]) -> u32 {
    let end = SIZE_PAGE - SIZE_FIL_TRAILER;
    let head = crc32c::crc32c(&page[FIL_PAGE_OFFSET..FIL_PAGE_FILE_FLUSH_LSN]);
    let body = crc32c::crc32c(&page[FIL_PAGE_DATA..end]);
    head ^ body
}

/// Legacy InnoDB checksum: `ut_fold_binary` over the same two ranges, summed.
pub fn legacy_checksum(page: &[u8]) -> u32 {
    let end = SIZE_PAGE - SIZE_FIL_TRAILER;
    let head = fold_binary(&page[FIL_PAGE_OFFSET..FIL_PAGE_FILE_FLUSH_LSN]);
    let body = fold_binary(&page[FIL_PAGE_DATA..end]);
    head.wrapping_add(body) as u32
}

#[inline]
fn fold_pair(n1: u64, n2: u64) -> u64 {
    let mask = UT_HASH_RANDOM_MASK as u64;
    let mask2 = UT_HASH_RANDOM_MASK2 as u64;
    ((((n1 ^ n2 ^ mask2) << 8).wrapping_add(n1)) ^ mask).wrapping_add(n2)
}

// Folds 4-byte words, then a tail of single bytes. A tail of 4..=7 bytes ends
// with one more 4-byte word (the fall-through order of MySQL's switch).
fn fold_binary(data: &[u8]) -> u64 {
    let aligned = data.len() & !7;
    let mut fold = data[..aligned]
        .chunks_exact(4)
        .fold(0u64, |acc, w| fold_pair(acc, BigEndian::read_u32(w) as u64));

    let tail = &data[aligned..];
    let (bytes, word) = if tail.len() >= 4 {
        tail.split_at(tail.len() - 4)
    } else {
        (tail, &tail[tail.len()..])
    };
    for &b in bytes {
        fold = fold_pair(fold, b as u64);
    }
    if word.len() == 4 {
        fold = fold_pair(fold, BigEndian::read_u32(word) as u64);
    }
    fold
}
