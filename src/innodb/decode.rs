//! Type-dispatched structural page decoding.
//!
//! [`decode_page`] looks at the page type in the FIL header and runs the
//! matching decoder, returning a [`PageBody`] variant. Page types without a
//! structural decoder come back as [`PageBody::Other`].

use serde::Serialize;

use crate::innodb::constants::FIL_PAGE_DATA;
use crate::innodb::fsp::FspHdrPage;
use crate::innodb::index::IndexPage;
use crate::innodb::inode::InodePage;
use crate::innodb::lob::BlobPage;
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::IdbError;

/// Decoded body of a page.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "body")]
pub enum PageBody {
    FspHdr(FspHdrPage),
    Xdes(FspHdrPage),
    Inode(InodePage),
    /// Clustered/secondary or SDI index page.
    Index(IndexPage),
    Blob(BlobPage),
    /// Never-initialized page.
    Allocated,
    Other(PageType),
}

/// Decode the body of a framed page according to its type.
///
/// # Examples
///
/// ```
/// use idbq::innodb::decode::{decode_page, PageBody};
/// use idbq::innodb::page::Page;
///
/// let page = Page::parse(5, vec![0u8; 16384]).unwrap();
/// assert!(matches!(decode_page(&page).unwrap(), PageBody::Allocated));
/// ```
pub fn decode_page(page: &Page) -> Result<PageBody, IdbError> {
    Ok(match page.page_type() {
        PageType::FspHdr => PageBody::FspHdr(FspHdrPage::parse(page)?),
        PageType::Xdes => PageBody::Xdes(FspHdrPage::parse(page)?),
        PageType::Inode => PageBody::Inode(InodePage::parse(page)?),
        PageType::Index | PageType::Sdi => PageBody::Index(IndexPage::parse(page)?),
        PageType::Blob | PageType::SdiBlob => {
            PageBody::Blob(BlobPage::parse(page, FIL_PAGE_DATA)?)
        }
        PageType::Allocated => PageBody::Allocated,
        other => PageBody::Other(other),
    })
}
