//! Paged search results.

use serde::{Deserialize, Serialize};

/// One page of results plus the paging window and the total match count.
///
/// `total_count` is the number of matches independent of the page size, and is
/// never smaller than the number of items on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// The items on this page, in store order.
    pub items: Vec<T>,
    /// Offset of the first item.
    pub offset: u32,
    /// Requested page size.
    pub limit: u32,
    /// Total number of matching entities.
    pub total_count: u64,
}

impl<T> PagedResult<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, offset: u32, limit: u32, total_count: u64) -> Self {
        Self {
            items,
            offset,
            limit,
            total_count,
        }
    }

    /// Returns the number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if matches exist beyond this page.
    pub fn has_more(&self) -> bool {
        u64::from(self.offset) + (self.items.len() as u64) < self.total_count
    }

    /// Offset of the following page, if there is one.
    pub fn next_offset(&self) -> Option<u32> {
        self.has_more()
            .then(|| self.offset.saturating_add(self.items.len() as u32))
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> PagedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            offset: self.offset,
            limit: self.limit,
            total_count: self.total_count,
        }
    }
}
