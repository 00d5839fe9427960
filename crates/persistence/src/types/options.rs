//! Declarative paging parameters for searches.

use serde::{Deserialize, Serialize};

/// Limit and offset for a search. Both are required for a paged search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Maximum number of results to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Number of matching results to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl QueryOptions {
    /// Creates options with neither limit nor offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for one page.
    pub fn paged(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Sets the limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let opts = QueryOptions::new().with_limit(10);
        assert_eq!(opts.limit, Some(10));
        assert_eq!(opts.offset, None);
        assert_eq!(QueryOptions::paged(5, 20), QueryOptions::new().with_offset(20).with_limit(5));
    }
}
