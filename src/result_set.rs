//! Per-page accumulator owned by one collection fetch

use std::collections::{BTreeMap, BTreeSet};

use crate::types::PageIndex;

/// Records fetched so far, keyed by page, plus the pages that failed
///
/// A page is in at most one of the two at any time. Only the coordinating loop of a
/// fetch mutates it; page tasks hand their outcome back instead of writing here.
#[derive(Clone, Debug, PartialEq)]
pub struct PagedResultSet<R> {
    pages: BTreeMap<PageIndex, Vec<R>>,
    failed_pages: BTreeSet<PageIndex>,
}

impl<R> Default for PagedResultSet<R> {
    fn default() -> Self {
        Self {
            pages: BTreeMap::new(),
            failed_pages: BTreeSet::new(),
        }
    }
}

impl<R> PagedResultSet<R> {
    /// Empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fetched page, clearing any earlier failure for it
    pub fn record_success(&mut self, page: PageIndex, records: Vec<R>) {
        self.failed_pages.remove(&page);
        self.pages.insert(page, records);
    }

    /// Mark a page as failed. A page that already has records keeps them.
    pub fn record_failure(&mut self, page: PageIndex) {
        if !self.pages.contains_key(&page) {
            self.failed_pages.insert(page);
        }
    }

    /// Records of one page, if it was fetched
    pub fn page(&self, page: PageIndex) -> Option<&[R]> {
        self.pages.get(&page).map(Vec::as_slice)
    }

    /// Pages that are currently failed
    pub fn failed_pages(&self) -> &BTreeSet<PageIndex> {
        &self.failed_pages
    }

    /// Number of pages fetched successfully
    pub fn fetched_pages(&self) -> usize {
        self.pages.len()
    }

    /// Whether every page in `1..=total_pages` is either fetched or failed
    pub fn is_settled(&self, total_pages: u32) -> bool {
        PageIndex::range(total_pages)
            .all(|p| self.pages.contains_key(&p) || self.failed_pages.contains(&p))
    }

    /// Split into the fetched pages and the failed set
    pub fn into_parts(self) -> (BTreeMap<PageIndex, Vec<R>>, BTreeSet<PageIndex>) {
        (self.pages, self.failed_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_clears_previous_failure() {
        let mut set = PagedResultSet::new();
        set.record_failure(PageIndex(2));
        assert!(set.failed_pages().contains(&PageIndex(2)));

        set.record_success(PageIndex(2), vec!["a", "b"]);
        assert!(set.failed_pages().is_empty());
        assert_eq!(set.page(PageIndex(2)), Some(&["a", "b"][..]));
    }

    #[test]
    fn failure_never_discards_fetched_records() {
        let mut set = PagedResultSet::new();
        set.record_success(PageIndex(1), vec![1]);
        set.record_failure(PageIndex(1));
        assert!(set.failed_pages().is_empty());
        assert_eq!(set.fetched_pages(), 1);
    }

    #[test]
    fn settled_once_every_page_is_accounted_for() {
        let mut set = PagedResultSet::new();
        set.record_success(PageIndex(1), vec![1]);
        set.record_failure(PageIndex(3));
        assert!(!set.is_settled(3));

        set.record_success(PageIndex(2), vec![2]);
        assert!(set.is_settled(3));
        assert!(PagedResultSet::<u8>::new().is_settled(0));
    }
}
