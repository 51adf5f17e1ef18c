//! Pagination and date-range helpers shared by list endpoints.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};

/// Default page size when the caller gives none
pub const DEFAULT_LIMIT: u64 = 20;
/// Largest page size a caller may ask for
pub const MAX_LIMIT: u64 = 100;

/// A 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Page number, starting at 1
    pub page: u64,
    /// Rows per page
    pub limit: u64,
}

impl Page {
    /// Builds a page request, clamping to sane bounds.
    #[must_use]
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Zero-based page index as used by `SeaORM`'s paginator
    #[must_use]
    pub const fn index(self) -> u64 {
        self.page - 1
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    /// Rows on this page
    pub data: Vec<T>,
    /// Page number, starting at 1
    pub page: u64,
    /// Rows per page
    pub limit: u64,
    /// Rows across all pages
    pub total: u64,
}

impl<T> Paginated<T> {
    /// Wraps a fetched page.
    #[must_use]
    pub const fn new(data: Vec<T>, page: Page, total: u64) -> Self {
        Self {
            data,
            page: page.page,
            limit: page.limit,
            total,
        }
    }
}

/// Inclusive range of calendar days (UTC)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DateRange {
    /// First day included
    pub from: Option<NaiveDate>,
    /// Last day included
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Lower bound (inclusive) as a UTC instant
    #[must_use]
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.from.map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// Upper bound (exclusive): midnight after the last included day
    #[must_use]
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.to
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// `start <= column < end` for whichever bounds are set
    #[must_use]
    pub fn condition<C>(&self, column: C) -> Condition
    where
        C: ColumnTrait,
    {
        let mut condition = Condition::all();
        if let Some(start) = self.start() {
            condition = condition.add(column.gte(start));
        }
        if let Some(end) = self.end() {
            condition = condition.add(column.lt(end));
        }
        condition
    }
}

/// Trims a search string, treating blank input as "no search".
#[must_use]
pub fn clean_search(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}
