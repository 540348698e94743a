//! Pagination contract for the paged reports.

use serde::Serialize;

pub const DEFAULT_LIMIT: u64 = 10;
pub const DEFAULT_OFFSET: u64 = 0;
/// Safety cap applied when no explicit cap is configured.
pub const DEFAULT_MAX_LIMIT: u64 = 1000;

/// Page window requested by the client, after lenient parsing and clamping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl PageRequest {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// Build a page window from raw query-string values.
    ///
    /// Values are read with a leading-integer parse (`"12abc"` is 12). Missing
    /// or digit-less values take the defaults. Negative values clamp to 0 and
    /// `limit` is capped at `max_limit`.
    pub fn from_params(limit: Option<&str>, offset: Option<&str>, max_limit: u64) -> Self {
        let limit = limit
            .and_then(parse_leading_int)
            .map(|v| clamp_non_negative(v).min(max_limit))
            .unwrap_or(DEFAULT_LIMIT.min(max_limit));
        let offset = offset
            .and_then(parse_leading_int)
            .map(clamp_non_negative)
            .unwrap_or(DEFAULT_OFFSET);
        Self { limit, offset }
    }
}

fn clamp_non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

/// Parse an optionally signed run of leading decimal digits.
///
/// Leading whitespace is skipped and anything after the digits is ignored.
/// Returns `None` when no digit is present; saturates on overflow.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    seen.then_some(if negative { -value } else { value })
}

/// Pagination block returned next to every paged list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationBlock {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

impl PaginationBlock {
    /// `total` must be an independent full count, not the page length.
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            total,
            limit: request.limit,
            offset: request.offset,
            has_more: request.offset.saturating_add(request.limit) < total,
        }
    }
}

/// A page of items plus its pagination block.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PaginationBlock,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            pagination: PaginationBlock::new(request, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_apply_when_params_are_missing() {
        assert_eq!(PageRequest::from_params(None, None, DEFAULT_MAX_LIMIT), PageRequest::new(10, 0));
    }

    #[test]
    fn lenient_parsing() {
        assert_eq!(parse_leading_int("12abc"), Some(12));
        assert_eq!(parse_leading_int("  7"), Some(7));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("+4"), Some(4));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let page = PageRequest::from_params(Some("lots"), Some("nope"), DEFAULT_MAX_LIMIT);
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let page = PageRequest::from_params(Some("-5"), Some("-1"), DEFAULT_MAX_LIMIT);
        assert_eq!(page, PageRequest::new(0, 0));

        let page = PageRequest::from_params(Some("50000"), Some("20"), 100);
        assert_eq!(page, PageRequest::new(100, 20));
    }

    #[test]
    fn has_more_scenarios() {
        assert!(PaginationBlock::new(PageRequest::new(2, 0), 5).has_more);
        assert!(!PaginationBlock::new(PageRequest::new(2, 4), 5).has_more);
        assert!(!PaginationBlock::new(PageRequest::new(2, 3), 5).has_more);
        assert!(!PaginationBlock::new(PageRequest::new(10, 0), 0).has_more);
    }

    #[test]
    fn block_serializes_in_camel_case() {
        let json = serde_json::to_value(PaginationBlock::new(PageRequest::new(2, 0), 5)).unwrap();
        assert_eq!(json, serde_json::json!({"total": 5, "limit": 2, "offset": 0, "hasMore": true}));
    }

    proptest! {
        #[test]
        fn has_more_iff_window_ends_before_total(limit in 0u64..10_000, offset in 0u64..10_000, total in 0u64..20_000) {
            let block = PaginationBlock::new(PageRequest::new(limit, offset), total);
            prop_assert_eq!(block.has_more, offset + limit < total);
        }
    }
}
