//! Page walking for collection endpoints.
//!
//! The API does not let callers pick a page size; every page holds
//! [`PAGE_SIZE`] items and `meta.count` reports the collection total.

use std::future::Future;

use crate::error::DockmanResult;

/// Fixed server-side page size.
pub const PAGE_SIZE: u64 = 50;

/// Number of pages needed to hold `count` items.
#[must_use]
pub const fn page_count(count: u64) -> u64 {
    count.div_ceil(PAGE_SIZE)
}

/// Fetch pages `0..page_count(count)` in order and concatenate their items.
pub async fn collect_pages<T, F, Fut>(count: u64, mut fetch_page: F) -> DockmanResult<Vec<T>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = DockmanResult<Vec<T>>>,
{
    let pages = page_count(count);
    let mut items = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
    for page in 0..pages {
        items.extend(fetch_page(page).await?);
    }
    Ok(items)
}
