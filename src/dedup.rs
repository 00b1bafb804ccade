//! Fingerprint-based duplicate detection.
//!
//! The comparison set is bounded to stored events starting within the
//! lookback window. Duplicates of events older than the window will be
//! inserted again; that bounds the store query and is intentional, not a bug.

use crate::domain::NormalizedEvent;
use crate::domain::StoredEventRow;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;

/// Identity token for duplicate detection:
/// `lowercase(trim(title)) + "|" + ISO-8601 start`.
pub fn make_fingerprint(title: &str, start: DateTime<Utc>) -> String {
    format!(
        "{}|{}",
        title.trim().to_lowercase(),
        start.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Fingerprints for a slice of stored rows.
pub fn fingerprint_set(rows: &[StoredEventRow]) -> HashSet<String> {
    rows.iter()
        .map(|row| make_fingerprint(&row.title, row.start_at))
        .collect()
}

/// Drops events whose fingerprint collides with a stored event or with an
/// earlier event in the same batch. First occurrence wins; fetch order is
/// preserved.
pub fn dedupe_events(
    events: Vec<NormalizedEvent>,
    existing: &HashSet<String>,
) -> Vec<NormalizedEvent> {
    let mut seen = existing.clone();
    let mut unique = Vec::with_capacity(events.len());
    for event in events {
        let token = make_fingerprint(&event.title, event.start);
        if seen.contains(&token) {
            continue;
        }
        seen.insert(token);
        unique.push(event);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(title: &str, start: DateTime<Utc>) -> NormalizedEvent {
        NormalizedEvent {
            source_key: "test".to_string(),
            external_id: format!("{title}-{start}"),
            title: title.to_string(),
            description: None,
            start,
            end: start + chrono::Duration::hours(1),
            categories: Vec::new(),
            organizer: None,
            venue: None,
            venue_lat: None,
            venue_lon: None,
            venue_street: None,
            venue_city: None,
            venue_state: None,
            venue_postal_code: None,
            status: None,
        }
    }

    #[test]
    fn fingerprint_is_stable_under_case_and_whitespace() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(
            make_fingerprint("Career Fair", start),
            make_fingerprint("  career FAIR  ", start)
        );
        assert_eq!(
            make_fingerprint("Career Fair", start),
            "career fair|2024-03-01T10:00:00Z"
        );
    }

    #[test]
    fn within_batch_duplicates_collapse_first_wins() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut first = event("Career Fair", start);
        first.external_id = "keep-me".to_string();
        let second = event("Career Fair", start);
        let third = event("Job Fair", start);

        let surviving = dedupe_events(vec![first, second, third], &HashSet::new());
        assert_eq!(surviving.len(), 2);
        assert_eq!(surviving[0].external_id, "keep-me");
        assert_eq!(surviving[1].title, "Job Fair");
    }

    #[test]
    fn stored_fingerprints_drop_incoming_duplicates() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let stored = vec![StoredEventRow {
            title: "Career Fair".to_string(),
            start_at: start,
        }];
        let existing = fingerprint_set(&stored);

        let surviving = dedupe_events(vec![event("career fair", start)], &existing);
        assert!(surviving.is_empty());
    }

    #[test]
    fn dedup_is_idempotent() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let batch = vec![
            event("A", start),
            event("A", start),
            event("B", start),
        ];
        let existing: HashSet<String> = HashSet::new();

        let once = dedupe_events(batch.clone(), &existing);
        let twice = dedupe_events(once.clone(), &existing);
        assert_eq!(once.len(), twice.len());
        let titles: Vec<&str> = once.iter().map(|e| e.title.as_str()).collect();
        let titles_again: Vec<&str> = twice.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, titles_again);
    }

    #[test]
    fn same_title_different_start_is_not_a_duplicate() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 19, 0, 0).unwrap();
        let surviving = dedupe_events(
            vec![event("Career Fair", morning), event("Career Fair", evening)],
            &HashSet::new(),
        );
        assert_eq!(surviving.len(), 2);
    }
}
