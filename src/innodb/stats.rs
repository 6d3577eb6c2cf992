//! Page fill statistics for the clustered index.
//!
//! A page's fill ratio is the share of its 16 KiB occupied by live data:
//! the record heap up to the heap top, plus the trailer and page directory,
//! less the bytes of deleted records still sitting in the heap.

use serde::Serialize;

use crate::innodb::constants::SIZE_PAGE;
use crate::innodb::index::IndexPage;

/// Fill of one INDEX page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFill {
    pub page_number: u32,
    pub level: u16,
    /// Records declared by the page header.
    pub records: usize,
    pub used_bytes: usize,
    pub fill_ratio: f64,
}

impl From<&IndexPage> for PageFill {
    fn from(index: &IndexPage) -> Self {
        PageFill {
            page_number: index.page_number,
            level: index.level(),
            records: index.n_recs(),
            used_bytes: index.used_bytes(),
            fill_ratio: index.fill_ratio(),
        }
    }
}

/// Fill aggregated over every page of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillStats {
    pub pages: u64,
    pub leaf_pages: u64,
    pub internal_pages: u64,
    pub records: u64,
    pub used_bytes: u64,
    /// `used_bytes` over the total size of the counted pages.
    pub fill_ratio: f64,
}

impl FillStats {
    /// Fold one page into the aggregate.
    pub fn add(&mut self, page: &PageFill) {
        self.pages += 1;
        if page.level == 0 {
            self.leaf_pages += 1;
        } else {
            self.internal_pages += 1;
        }
        self.records += page.records as u64;
        self.used_bytes += page.used_bytes as u64;
        self.fill_ratio = self.used_bytes as f64 / (self.pages * SIZE_PAGE as u64) as f64;
    }
}

impl<'a> FromIterator<&'a PageFill> for FillStats {
    fn from_iter<I: IntoIterator<Item = &'a PageFill>>(iter: I) -> Self {
        let mut stats = FillStats::default();
        for page in iter {
            stats.add(page);
        }
        stats
    }
}
