//! Merge per-page results into one ordered release list.

use std::collections::BTreeSet;

use crate::result_set::PagedResultSet;
use crate::types::PageIndex;

/// Concatenate pages `1..=total_pages` in order, keeping each page's internal order.
///
/// Pages that are missing (still failed) are skipped, so the output may be shorter than
/// the collection but is never out of order. Pure: the result set is not modified.
pub fn assemble<R: Clone>(results: &PagedResultSet<R>, total_pages: u32) -> Vec<R> {
    PageIndex::range(total_pages)
        .filter_map(|page| results.page(page))
        .flat_map(|records| records.iter().cloned())
        .collect()
}

/// Consuming form of [`assemble`], also handing back the failed pages
pub fn assemble_owned<R>(
    results: PagedResultSet<R>,
    total_pages: u32,
) -> (Vec<R>, BTreeSet<PageIndex>) {
    let (mut pages, failed_pages) = results.into_parts();
    let mut releases = Vec::with_capacity(pages.values().map(Vec::len).sum());
    for page in PageIndex::range(total_pages) {
        if let Some(records) = pages.remove(&page) {
            releases.extend(records);
        }
    }
    (releases, failed_pages)
}
