//! Domain data shapes shared across the pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication status of an event, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Scheduled,
    Cancelled,
    Postponed,
}

impl EventStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "cancelled" => Some(Self::Cancelled),
            "postponed" => Some(Self::Postponed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Cancelled => "cancelled",
            Self::Postponed => "postponed",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical in-memory event representation, independent of feed format.
///
/// Invariants held after normalization: `external_id` non-empty, `title`
/// trimmed and non-empty, `end > start`, categories lowercase/trimmed with no
/// duplicates. The `venue_*` enrichment fields are populated only when a
/// geocoding lookup succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub source_key: String,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub categories: Vec<String>,
    pub organizer: Option<String>,
    pub venue: Option<String>,
    pub venue_lat: Option<f64>,
    pub venue_lon: Option<f64>,
    pub venue_street: Option<String>,
    pub venue_city: Option<String>,
    pub venue_state: Option<String>,
    pub venue_postal_code: Option<String>,
    pub status: Option<EventStatus>,
}

/// Row shape for the bulk event insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertEventPayload {
    pub organizer_id: Option<i64>,
    pub venue_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: EventStatus,
}

/// Unit handed to the persistence writer: a normalized event plus everything
/// resolution produced for it.
#[derive(Debug, Clone)]
pub struct PendingInsert {
    pub normalized: NormalizedEvent,
    pub source_key: String,
    pub payload: InsertEventPayload,
    pub categories: Vec<String>,
}

/// Title/start projection of a stored event, used to seed the dedup set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEventRow {
    pub title: String,
    pub start_at: DateTime<Utc>,
}

/// (id, name) row from a reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefRow {
    pub id: i64,
    pub name: String,
}

/// New venue row, either synthesized from geocoding or a placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVenueRow {
    pub name: String,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// New organizer row for the placeholder pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrganizerRow {
    pub org_name: String,
    pub website_url: Option<String>,
}

/// Category association row fanned out after the event insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCategoryRow {
    pub event_id: i64,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(EventStatus::parse(" Cancelled "), Some(EventStatus::Cancelled));
        assert_eq!(EventStatus::parse("POSTPONED"), Some(EventStatus::Postponed));
        assert_eq!(EventStatus::parse("nope"), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&EventStatus::Postponed).unwrap();
        assert_eq!(json, "\"postponed\"");
        assert_eq!(EventStatus::Scheduled.to_string(), "scheduled");
    }
}
