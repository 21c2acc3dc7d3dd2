//! Pagination parameters and their normalization
//!
//! List requests carry `limit`, `page`, `sort` and `unlimited` in the query
//! string. Raw values are parsed leniently and then normalized so that a
//! [`Pagination`] handed to a model always satisfies:
//!
//! - `1 <= limit <= 100`, or `limit == UNLIMITED` when unlimited was requested
//! - `page >= 1`
//!
//! ```text
//! GET /product/list?limit=25&page=2&sort=price:desc
//! GET /product/list?unlimited=true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel limit meaning "return every matching item"
pub const UNLIMITED: i64 = -1;

/// Limit applied when the requested one is missing or out of range
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size a client may request
pub const MAX_LIMIT: i64 = 100;

/// Normalized pagination for a List query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Page size, or [`UNLIMITED`]
    pub limit: i64,

    /// Page number (starts at 1)
    pub page: i64,

    /// Sort expression (`field`, `field:asc`, `field:desc`); empty means
    /// the collection's default order
    pub sort: String,

    /// Whether the client asked for every item
    pub unlimited: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 1,
            sort: String::new(),
            unlimited: false,
        }
    }
}

impl Pagination {
    /// Build a pagination from raw values and normalize it
    pub fn new(limit: i64, page: i64, sort: impl Into<String>, unlimited: bool) -> Self {
        Self {
            limit,
            page,
            sort: sort.into(),
            unlimited,
        }
        .normalized()
    }

    /// Parse pagination from a decoded query map
    ///
    /// Values that are not integers count as 0 and are then normalized like
    /// any other out-of-range value.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let int = |key: &str| {
            query
                .get(key)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0)
        };

        let unlimited = query
            .get("unlimited")
            .map(|v| parse_flag(v))
            .unwrap_or(false);

        Self::new(
            int("limit"),
            int("page"),
            query.get("sort").cloned().unwrap_or_default(),
            unlimited,
        )
    }

    /// Apply the normalization rules, in order:
    ///
    /// 1. a limit outside `[1, 100]` becomes 10
    /// 2. the unlimited flag overrides the limit with [`UNLIMITED`]
    /// 3. a page below 1 becomes 1
    ///
    /// Sort passes through unchanged. Normalizing twice is a no-op.
    pub fn normalized(mut self) -> Self {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            self.limit = DEFAULT_LIMIT;
        }

        if self.unlimited {
            self.limit = UNLIMITED;
        }

        if self.page < 1 {
            self.page = 1;
        }

        self
    }

    /// Whether every item should be returned
    pub fn is_unlimited(&self) -> bool {
        self.limit == UNLIMITED
    }

    /// Number of items to skip for the current page
    pub fn offset(&self) -> usize {
        if self.is_unlimited() {
            return 0;
        }
        let skipped = (self.page - 1).saturating_mul(self.limit);
        usize::try_from(skipped).unwrap_or(usize::MAX)
    }

    /// Number of pages needed for `total` items
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else if self.is_unlimited() {
            1
        } else {
            (total + self.limit - 1) / self.limit
        }
    }

    /// Split the sort expression into field and descending flag
    ///
    /// Returns `None` when no sort was requested.
    pub fn sort_key(&self) -> Option<(&str, bool)> {
        let sort = self.sort.trim();
        if sort.is_empty() {
            return None;
        }

        match sort.split_once(':') {
            Some((field, direction)) => {
                Some((field, direction.eq_ignore_ascii_case("desc")))
            }
            None => Some((sort, false)),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}
