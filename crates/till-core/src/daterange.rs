//! # Date Range Resolver
//!
//! Resolves a report's declared date window into a concrete
//! `[start, end]` pair of dates at fire time.
//!
//! ## Resolution Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fixed                start/end verbatim (missing bound -> today)       │
//! │  last7days            today - 7  .. today                               │
//! │  last30days           today - 30 .. today                               │
//! │  last90days           today - 90 .. today                               │
//! │  thisMonth            1st of current month .. today                     │
//! │  lastMonth            1st of previous month .. last day of previous     │
//! │                       month (end is NOT today)                          │
//! │  thisYear             Jan 1 .. today                                    │
//! │  unknown / absent     last30days                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The anchor is "today" at local midnight; callers pass it in, so
//! resolution is deterministic and clock-free.

use chrono::{Datelike, NaiveDate};

use crate::recurrence::days_in_month;
use crate::types::{DateRange, DateRangeConfig, DateRangeType, RelativeRange};

/// Resolves a date range declaration against the given anchor date.
///
/// Every branch guarantees `end >= start` by construction; fixed ranges
/// rely on boundary validation having enforced the same ordering.
pub fn resolve(
    range_type: DateRangeType,
    config: &DateRangeConfig,
    today: NaiveDate,
) -> DateRange {
    match range_type {
        DateRangeType::Fixed => DateRange::new(
            config.start_date.unwrap_or(today),
            config.end_date.unwrap_or(today),
        ),

        DateRangeType::Relative => {
            let relative = config.relative_type.unwrap_or_default();
            resolve_relative(relative, today)
        }
    }
}

/// Resolves one of the named relative windows.
pub fn resolve_relative(relative: RelativeRange, today: NaiveDate) -> DateRange {
    match relative {
        RelativeRange::Last7Days => days_back(today, 7),
        RelativeRange::Last30Days => days_back(today, 30),
        RelativeRange::Last90Days => days_back(today, 90),

        RelativeRange::ThisMonth => {
            let start = today.with_day(1).unwrap_or(today);
            DateRange::new(start, today)
        }

        RelativeRange::LastMonth => {
            let (year, month) = if today.month() == 1 {
                (today.year() - 1, 12)
            } else {
                (today.year(), today.month() - 1)
            };
            let last_day = days_in_month(year, month);
            let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today);
            let end = NaiveDate::from_ymd_opt(year, month, last_day).unwrap_or(today);
            DateRange::new(start, end)
        }

        RelativeRange::ThisYear => {
            let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
            DateRange::new(start, today)
        }
    }
}

fn days_back(today: NaiveDate, days: u64) -> DateRange {
    let start = today
        .checked_sub_days(chrono::Days::new(days))
        .unwrap_or(today);
    DateRange::new(start, today)
}

// =============================================================================
// Unit Tests
// =============================================================================
