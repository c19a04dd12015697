//! Recency filter
//!
//! Decides whether a candidate was published inside the configured window.
//! Precise timestamps are compared directly. Relative-age tags are coarse: a
//! tag in weeks, months or years is treated as stale, anything finer (or text
//! that could not be parsed) is treated as "published now". Items without any
//! signal are eligible.
//!
//! The day-granularity approximation means "10 days ago" passes a 7-day
//! window. Unknown freshness is let through; known staleness is not.

use crate::types::{CandidateItem, PublishSignal};
use chrono::{DateTime, Duration, Utc};

/// Start of a window of `window_days` ending now
pub fn window_start(window_days: u32) -> DateTime<Utc> {
    window_start_from(Utc::now(), window_days)
}

/// Start of a window of `window_days` ending at `now`
pub fn window_start_from(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(window_days))
}

/// Whether `item` is inside the window starting at `window_start`
pub fn is_eligible(item: &CandidateItem, window_start: DateTime<Utc>) -> bool {
    match &item.publish_signal {
        None => true,
        Some(PublishSignal::Timestamp(published)) => *published >= window_start,
        Some(PublishSignal::Relative(age)) => match age.unit() {
            Some(unit) if unit.is_coarse_stale() => false,
            // Fine-grained or unrecognized: approximated as "now"
            _ => true,
        },
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RelativeAge;

    fn with_relative(text: &str) -> CandidateItem {
        CandidateItem::new(
            "id",
            "title",
            "https://example.com/id",
            Some(PublishSignal::Relative(RelativeAge::parse(text))),
        )
    }

    fn with_timestamp(ts: DateTime<Utc>) -> CandidateItem {
        CandidateItem::new(
            "id",
            "title",
            "https://example.com/id",
            Some(PublishSignal::Timestamp(ts)),
        )
    }

    #[test]
    fn coarse_stale_tags_are_excluded() {
        let start = window_start(7);
        assert!(!is_eligible(&with_relative("3 weeks ago"), start));
        assert!(!is_eligible(&with_relative("1 week ago"), start));
        assert!(!is_eligible(&with_relative("2 months ago"), start));
        assert!(!is_eligible(&with_relative("Streamed 1 year ago"), start));
    }

    #[test]
    fn fine_tags_are_included() {
        let start = window_start(7);
        assert!(is_eligible(&with_relative("5 hours ago"), start));
        assert!(is_eligible(&with_relative("12 minutes ago"), start));
        assert!(is_eligible(&with_relative("Streamed 2 days ago"), start));
    }

    #[test]
    fn day_tags_beyond_window_still_pass() {
        // Known precision gap: day tags are approximated as now
        assert!(is_eligible(&with_relative("10 days ago"), window_start(7)));
    }

    #[test]
    fn unrecognized_text_and_missing_signal_are_included() {
        let start = window_start(7);
        assert!(is_eligible(&with_relative("Premiered recently"), start));
        let no_signal = CandidateItem::new("id", "title", "https://example.com/id", None);
        assert!(is_eligible(&no_signal, start));
    }

    #[test]
    fn timestamps_compare_against_window_start() {
        let now = Utc::now();
        let start = window_start_from(now, 7);

        assert!(is_eligible(&with_timestamp(now - Duration::days(2)), start));
        assert!(is_eligible(&with_timestamp(start), start), "boundary is inclusive");
        assert!(!is_eligible(&with_timestamp(now - Duration::days(8)), start));
    }

    #[test]
    fn zero_day_window_starts_now() {
        let now = Utc::now();
        assert_eq!(window_start_from(now, 0), now);
    }
}
