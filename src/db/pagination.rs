//! Cursor pagination over reverse-chronological feeds.
//!
//! A cursor is the creation timestamp of the last item the client saw,
//! normalized to the storage format. Pages are fetched with one extra row
//! so `has_more` never needs a second count query.

use chrono::{DateTime, Utc};

use super::storage_timestamp;

/// Hard ceiling on page size. Requests above it are clamped, not rejected.
pub const MAX_PAGE_SIZE: i64 = 50;

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(0, MAX_PAGE_SIZE)
}

/// A pagination cursor, held in the storage timestamp format so it can be
/// compared against `created_at` columns directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    /// Parse a client-supplied cursor. Accepts any RFC 3339 timestamp and
    /// normalizes it, since clients echo back `createdAt` values whose
    /// offset rendering may differ from the stored form.
    pub fn decode(raw: &str) -> Option<Self> {
        let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
        Some(Self(storage_timestamp(parsed.with_timezone(&Utc))))
    }

    pub(crate) fn as_sql(&self) -> &str {
        &self.0
    }
}

/// One page of a feed plus whether anything older remains.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with `limit + 1`: the extra row, if
    /// present, only signals that more items exist.
    pub(crate) fn from_overfetch(mut rows: Vec<T>, limit: i64) -> Self {
        let has_more = rows.len() as i64 > limit;
        rows.truncate(limit as usize);
        Page {
            items: rows,
            has_more,
        }
    }
}
