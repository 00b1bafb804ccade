//! JSON feed adapter. Unlike the other adapters, a payload that fails schema
//! validation rejects the whole source, not individual records.

use crate::config::EventSourceConfig;
use crate::constants::DEFAULT_JSON_DURATION_MINUTES;
use crate::domain::{EventStatus, NormalizedEvent};
use crate::error::{IngestError, Result};
use crate::normalize;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

static FEED_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["id", "title", "start_at"],
            "properties": {
                "id": { "type": "string" },
                "title": { "type": "string", "minLength": 1 },
                "description": { "type": ["string", "null"] },
                "start_at": { "type": "string" },
                "end_at": { "type": ["string", "null"] },
                "categories": { "type": "array", "items": { "type": "string" } },
                "organizer": { "type": ["string", "null"] },
                "venue": { "type": ["string", "null"] },
                "status": { "enum": ["scheduled", "cancelled", "postponed", null] }
            }
        }
    })
});

#[derive(Debug, Deserialize)]
struct JsonFeedItem {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    start_at: String,
    #[serde(default)]
    end_at: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    organizer: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    status: Option<EventStatus>,
}

#[instrument(skip_all, fields(source = %config.key))]
pub async fn collect_events(config: &EventSourceConfig) -> Result<Vec<NormalizedEvent>> {
    let raw = super::load_text(&config.url).await?;
    let payload: Value = serde_json::from_str(&raw)?;
    validate_payload(&payload)?;
    let items: Vec<JsonFeedItem> = serde_json::from_value(payload)?;

    let mut events = Vec::new();
    for item in items {
        let title = item.title.trim().to_string();
        if title.is_empty() {
            continue;
        }
        let Some(start) = super::parse_datetime(&item.start_at) else {
            continue;
        };
        let end = super::ensure_end(
            start,
            item.end_at.as_deref().and_then(super::parse_datetime),
            Some(DEFAULT_JSON_DURATION_MINUTES),
        );

        events.push(NormalizedEvent {
            source_key: config.key.clone(),
            external_id: item.id,
            title,
            description: item.description,
            start,
            end,
            categories: normalize::merge_categories(item.categories, &config.tags),
            organizer: item.organizer.or_else(|| config.default_organizer_name.clone()),
            venue: item.venue.or_else(|| config.default_venue_name.clone()),
            venue_lat: None,
            venue_lon: None,
            venue_street: None,
            venue_city: None,
            venue_state: None,
            venue_postal_code: None,
            status: item.status.or(config.default_status),
        });
    }

    Ok(events)
}

fn validate_payload(payload: &Value) -> Result<()> {
    let schema = JSONSchema::compile(&FEED_SCHEMA)
        .map_err(|e| IngestError::Schema(e.to_string()))?;
    if let Err(errors) = schema.validate(payload) {
        let detail = errors
            .map(|error| error.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(IngestError::Schema(detail));
    }
    Ok(())
}
