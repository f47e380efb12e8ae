//! Filter, sort and page evaluation over a snapshot of mappings.
//!
//! The engine is pure: callers hand it a point-in-time copy of the collection
//! and the current time, and get back a fresh `Vec`.

use crate::record::MappingRecord;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    ShortCode,
    OriginalUrl,
    /// Records without an expiry sort as the latest.
    ExpiresAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Expiry classification, evaluated against the clock at query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    /// No expiry, or expiry not before now.
    Active,
    /// Expiry strictly before now.
    Expired,
}

/// Criteria for [`QueryEngine::find`] and [`QueryEngine::count`].
///
/// Every criterion is optional; an absent one matches everything.
///
/// # Examples
///
/// ```
/// use linkforge_core::query::{Direction, QueryFilter, SortKey};
///
/// let filter = QueryFilter::builder()
///     .code_part("ex-")
///     .sort(SortKey::ShortCode)
///     .direction(Direction::Desc)
///     .offset(10)
///     .limit(5)
///     .build();
/// assert_eq!(filter.limit, Some(5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder)]
pub struct QueryFilter {
    /// Substring of the normalized short code.
    #[builder(default, setter(strip_option, into))]
    pub code_part: Option<String>,
    #[builder(default)]
    pub code_case_sensitive: bool,
    /// Substring of the stored original URL.
    #[builder(default, setter(strip_option, into))]
    pub url_part: Option<String>,
    #[builder(default)]
    pub url_case_sensitive: bool,
    /// Inclusive lower bound on `created_at`.
    #[builder(default, setter(strip_option))]
    pub created_from: Option<Timestamp>,
    /// Inclusive upper bound on `created_at`.
    #[builder(default, setter(strip_option))]
    pub created_to: Option<Timestamp>,
    #[builder(default)]
    pub status: StatusFilter,
    #[builder(default)]
    pub offset: usize,
    /// Unbounded when absent.
    #[builder(default, setter(strip_option))]
    pub limit: Option<usize>,
    #[builder(default)]
    pub sort: SortKey,
    #[builder(default)]
    pub direction: Direction,
}

impl QueryFilter {
    /// Whether `record` satisfies every predicate of this filter at `now`.
    pub fn matches(&self, record: &MappingRecord, now: Timestamp) -> bool {
        Predicate::new(self, now).matches(record)
    }

    /// Total order used by [`QueryEngine::find`].
    ///
    /// Ties on the sort key are broken by short code ascending, and
    /// [`Direction::Desc`] reverses the whole composed order.
    pub fn compare(&self, a: &MappingRecord, b: &MappingRecord) -> Ordering {
        let primary = match self.sort {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::ShortCode => a.short_code.cmp(&b.short_code),
            SortKey::OriginalUrl => a.original_url.cmp(&b.original_url),
            SortKey::ExpiresAt => match (a.expires_at, b.expires_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        let ordering = primary.then_with(|| a.short_code.cmp(&b.short_code));

        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// A filter with its case-folded needles computed once per query.
struct Predicate<'a> {
    filter: &'a QueryFilter,
    code_needle: Option<String>,
    url_needle: Option<String>,
    now: Timestamp,
}

impl<'a> Predicate<'a> {
    fn new(filter: &'a QueryFilter, now: Timestamp) -> Self {
        let fold = |part: &Option<String>, case_sensitive: bool| {
            part.as_ref().map(|p| {
                if case_sensitive {
                    p.clone()
                } else {
                    p.to_lowercase()
                }
            })
        };

        Self {
            filter,
            code_needle: fold(&filter.code_part, filter.code_case_sensitive),
            url_needle: fold(&filter.url_part, filter.url_case_sensitive),
            now,
        }
    }

    fn matches(&self, record: &MappingRecord) -> bool {
        if let Some(needle) = &self.code_needle {
            if !contains(
                record.short_code.as_str(),
                needle,
                self.filter.code_case_sensitive,
            ) {
                return false;
            }
        }

        if let Some(needle) = &self.url_needle {
            if !contains(&record.original_url, needle, self.filter.url_case_sensitive) {
                return false;
            }
        }

        if self
            .filter
            .created_from
            .is_some_and(|from| record.created_at < from)
        {
            return false;
        }

        if self
            .filter
            .created_to
            .is_some_and(|to| record.created_at > to)
        {
            return false;
        }

        match self.filter.status {
            StatusFilter::All => true,
            StatusFilter::Active => record.is_active_at(self.now),
            StatusFilter::Expired => record.is_expired_at(self.now),
        }
    }
}

fn contains(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        haystack.contains(needle)
    } else {
        haystack.to_lowercase().contains(needle)
    }
}

/// Evaluates [`QueryFilter`]s against a snapshot of records.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEngine;

impl QueryEngine {
    /// Filters, sorts and pages `snapshot`.
    pub fn find<I>(snapshot: I, filter: &QueryFilter, now: Timestamp) -> Vec<MappingRecord>
    where
        I: IntoIterator<Item = MappingRecord>,
    {
        let predicate = Predicate::new(filter, now);
        let mut matched: Vec<MappingRecord> = snapshot
            .into_iter()
            .filter(|record| predicate.matches(record))
            .collect();

        if filter.offset >= matched.len() {
            return Vec::new();
        }

        matched.sort_unstable_by(|a, b| filter.compare(a, b));

        let end = filter
            .limit
            .map_or(matched.len(), |limit| {
                matched.len().min(filter.offset.saturating_add(limit))
            });
        matched.truncate(end);
        matched.drain(..filter.offset);
        matched
    }

    /// Counts the records of `snapshot` that match, ignoring paging and sort.
    pub fn count<'a, I>(snapshot: I, filter: &QueryFilter, now: Timestamp) -> usize
    where
        I: IntoIterator<Item = &'a MappingRecord>,
    {
        let predicate = Predicate::new(filter, now);
        snapshot
            .into_iter()
            .filter(|record| predicate.matches(record))
            .count()
    }
}
