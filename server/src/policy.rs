//! Lifecycle rules for stored pastes.
//!
//! Everything here is a pure function of a record and the current time. The
//! caller is responsible for fetching, incrementing and deleting.

use chrono::{DateTime, Duration, Utc};

use crate::paste::PasteRecord;

/// Whether the record's expiry lies strictly in the past.
pub fn is_time_expired(record: &PasteRecord, now: DateTime<Utc>) -> bool {
    record.expires_at.map_or(false, |expires_at| now > expires_at)
}

/// Whether every permitted view was already handed out, as of this snapshot.
///
/// Checked before incrementing, so a request arriving after a concurrent
/// request consumed the last view is turned away.
pub fn is_view_exhausted(record: &PasteRecord) -> bool {
    record
        .max_views
        .map_or(false, |max_views| record.view_count >= max_views)
}

/// Whether the view that produced `view_count` was the final one.
pub fn is_last_view(record: &PasteRecord, view_count: u32) -> bool {
    record
        .max_views
        .map_or(false, |max_views| view_count >= max_views)
}

pub fn compute_expiry(now: DateTime<Utc>, hours: Option<u32>) -> Option<DateTime<Utc>> {
    hours.map(|hours| now + Duration::hours(i64::from(hours)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    fn record(expires_at: Option<DateTime<Utc>>, max_views: Option<u32>, views: u32) -> PasteRecord {
        let mut record = PasteRecord::new(
            "abcdefghij".parse().unwrap(),
            "Untitled".into(),
            "hello".into(),
            now() - Duration::hours(2),
            expires_at,
            max_views,
        );
        record.view_count = views;
        record
    }

    #[test]
    fn time_expiry_is_strict() {
        let at = now();
        assert!(!is_time_expired(&record(Some(at), None, 0), at));
        assert!(is_time_expired(
            &record(Some(at), None, 0),
            at + Duration::milliseconds(1)
        ));
        assert!(!is_time_expired(&record(None, None, 0), at + Duration::days(10_000)));
    }

    #[test]
    fn view_exhaustion_requires_a_limit() {
        assert!(!is_view_exhausted(&record(None, None, u32::MAX)));
        assert!(!is_view_exhausted(&record(None, Some(3), 2)));
        assert!(is_view_exhausted(&record(None, Some(3), 3)));
        assert!(is_view_exhausted(&record(None, Some(3), 4)));
    }

    #[test]
    fn last_view_uses_post_increment_count() {
        let r = record(None, Some(2), 1);
        assert!(!is_last_view(&r, 1));
        assert!(is_last_view(&r, 2));
        assert!(!is_last_view(&record(None, None, 0), 1_000_000));
    }

    #[test]
    fn expiry_is_monotonic_in_hours() {
        assert_eq!(compute_expiry(now(), None), None);
        assert_eq!(compute_expiry(now(), Some(1)), Some(now() + Duration::hours(1)));

        let mut previous = now();
        for hours in [1, 2, 24, 168, 8760] {
            let expiry = compute_expiry(now(), Some(hours)).unwrap();
            assert!(expiry > previous);
            previous = expiry;
        }
    }
}
