//! Page plan for one collection fetch

use crate::config::{MAX_CONCURRENCY, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::types::PageIndex;

/// How a collection of `item_count` items is split into pages and how many page
/// requests may be outstanding at once
///
/// Computed once per fetch and never changed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchPlan {
    /// Items the server reports in the collection
    pub item_count: u64,
    /// Items per page, within `1..=100`
    pub page_size: u32,
    /// `ceil(item_count / page_size)`; 0 for an empty collection
    pub total_pages: u32,
    /// Concurrency bound actually applied, within `1..=min(6, total_pages)` (at least 1)
    pub effective_concurrency: usize,
}

impl FetchPlan {
    /// Build a plan, clamping the page size and concurrency to their allowed ranges
    ///
    /// # Errors
    /// [`Error::CollectionTooLarge`] when the page count does not fit a page index.
    pub fn new(item_count: u64, page_size: u32, requested_concurrency: usize) -> Result<Self> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let total_pages = u32::try_from(item_count.div_ceil(u64::from(page_size)))
            .map_err(|_| Error::CollectionTooLarge {
                item_count,
                page_size,
            })?;

        let upper = MAX_CONCURRENCY.min(total_pages as usize).max(1);
        let effective_concurrency = requested_concurrency.clamp(1, upper);

        Ok(Self {
            item_count,
            page_size,
            total_pages,
            effective_concurrency,
        })
    }

    /// Whether there is nothing to fetch
    pub fn is_empty(&self) -> bool {
        self.total_pages == 0
    }

    /// Whether pages are fetched strictly one after another
    pub fn is_sequential(&self) -> bool {
        self.effective_concurrency == 1
    }

    /// All pages, in order
    pub fn pages(&self) -> impl Iterator<Item = PageIndex> {
        PageIndex::range(self.total_pages)
    }
}
