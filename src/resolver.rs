//! Entity resolution: free-text organizer/venue names onto foreign-key ids,
//! synthesizing reference rows when necessary.
//!
//! The lookup maps are scoped to a single ingestion cycle and mutated in
//! place as rows are synthesized, so later events in the same batch resolve
//! against earlier synthesis in one pass. Nothing here is cached across
//! cycles.

use crate::config::EventSourceConfig;
use crate::constants::{PLACEHOLDER_ORGANIZERS, PLACEHOLDER_VENUES};
use crate::domain::{
    EventStatus, InsertEventPayload, NewOrganizerRow, NewVenueRow, NormalizedEvent, PendingInsert,
};
use crate::error::Result;
use crate::normalize::{self, FallbackSampler};
use crate::store::EventStore;
use chrono::Duration;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Name→id maps for one ingestion cycle.
#[derive(Debug, Default)]
pub struct LookupMaps {
    pub organizer_map: HashMap<String, i64>,
    pub venue_map: HashMap<String, i64>,
    pub placeholder_organizer_ids: Vec<i64>,
    pub placeholder_venue_ids: Vec<i64>,
}

pub(crate) fn normalize_name(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Loads the organizer/venue reference tables. When fallbacks are enabled,
/// also materializes whichever placeholder rows the store is still missing
/// and records old and new ids as the sampling pools.
pub async fn load_lookups(store: &dyn EventStore, with_placeholders: bool) -> Result<LookupMaps> {
    let mut maps = LookupMaps::default();
    for row in store.organizers().await? {
        maps.organizer_map.insert(normalize_name(&row.name), row.id);
    }
    for row in store.venues().await? {
        maps.venue_map.insert(normalize_name(&row.name), row.id);
    }

    if with_placeholders {
        maps.placeholder_organizer_ids =
            ensure_placeholder_organizers(store, &mut maps.organizer_map).await?;
        maps.placeholder_venue_ids = ensure_placeholder_venues(store, &mut maps.venue_map).await?;
    }

    Ok(maps)
}

async fn ensure_placeholder_venues(
    store: &dyn EventStore,
    venue_map: &mut HashMap<String, i64>,
) -> Result<Vec<i64>> {
    let missing: Vec<NewVenueRow> = PLACEHOLDER_VENUES
        .iter()
        .filter(|venue| !venue_map.contains_key(&normalize_name(venue.name)))
        .map(|venue| NewVenueRow {
            name: venue.name.to_string(),
            street_address: Some(venue.street_address.to_string()),
            city: Some(venue.city.to_string()),
            state: Some(venue.state.to_string()),
            postal_code: Some(venue.postal_code.to_string()),
            lat: venue.lat,
            lon: venue.lon,
        })
        .collect();

    if !missing.is_empty() {
        for row in store.insert_venues(&missing).await? {
            venue_map.insert(normalize_name(&row.name), row.id);
        }
    }

    Ok(PLACEHOLDER_VENUES
        .iter()
        .filter_map(|venue| venue_map.get(&normalize_name(venue.name)).copied())
        .collect())
}

async fn ensure_placeholder_organizers(
    store: &dyn EventStore,
    organizer_map: &mut HashMap<String, i64>,
) -> Result<Vec<i64>> {
    let missing: Vec<NewOrganizerRow> = PLACEHOLDER_ORGANIZERS
        .iter()
        .filter(|org| !organizer_map.contains_key(&normalize_name(org.org_name)))
        .map(|org| NewOrganizerRow {
            org_name: org.org_name.to_string(),
            website_url: org.website_url.map(str::to_string),
        })
        .collect();

    if !missing.is_empty() {
        for row in store.insert_organizers(&missing).await? {
            organizer_map.insert(normalize_name(&row.name), row.id);
        }
    }

    Ok(PLACEHOLDER_ORGANIZERS
        .iter()
        .filter_map(|org| organizer_map.get(&normalize_name(org.org_name)).copied())
        .collect())
}

/// Synthesizes venue rows for geocoded events whose venue name is not in the
/// lookup map yet. First occurrence per name wins within the batch; the new
/// ids are registered in the map for reuse by later events in the same run.
pub async fn ensure_geocoded_venues(
    store: &dyn EventStore,
    events: &[NormalizedEvent],
    venue_map: &mut HashMap<String, i64>,
) -> Result<()> {
    let mut pending: Vec<NewVenueRow> = Vec::new();
    let mut pending_keys: HashSet<String> = HashSet::new();

    for event in events {
        let Some(venue) = event.venue.as_deref() else {
            continue;
        };
        let key = normalize_name(venue);
        if key.is_empty() || venue_map.contains_key(&key) || pending_keys.contains(&key) {
            continue;
        }
        let (Some(lat), Some(lon)) = (event.venue_lat, event.venue_lon) else {
            continue;
        };
        if lat.is_nan() || lon.is_nan() {
            continue;
        }

        pending_keys.insert(key);
        pending.push(NewVenueRow {
            name: venue.to_string(),
            street_address: event.venue_street.clone(),
            city: event.venue_city.clone(),
            state: event.venue_state.clone(),
            postal_code: event.venue_postal_code.clone(),
            lat,
            lon,
        });
    }

    if pending.is_empty() {
        return Ok(());
    }

    info!("Synthesizing {} venue row(s) from geocoded events", pending.len());
    for row in store.insert_venues(&pending).await? {
        venue_map.insert(normalize_name(&row.name), row.id);
    }
    Ok(())
}

fn lookup_id(value: Option<&str>, map: &HashMap<String, i64>) -> Option<i64> {
    let key = normalize_name(value?);
    if key.is_empty() {
        return None;
    }
    map.get(&key).copied()
}

/// Resolution order: config fixed id, event's own organizer text, config
/// default organizer name, then (demo only) a placeholder pool pick.
pub fn resolve_organizer_id(
    event: &NormalizedEvent,
    config: &EventSourceConfig,
    maps: &LookupMaps,
    sampler: &dyn FallbackSampler,
) -> Option<i64> {
    if let Some(id) = config.default_organizer_id {
        return Some(id);
    }
    if let Some(id) = lookup_id(event.organizer.as_deref(), &maps.organizer_map) {
        return Some(id);
    }
    if let Some(id) = lookup_id(config.default_organizer_name.as_deref(), &maps.organizer_map) {
        return Some(id);
    }
    sampler
        .pick_index(maps.placeholder_organizer_ids.len())
        .map(|index| maps.placeholder_organizer_ids[index])
}

/// Mirrors organizer resolution. Geocoded synthesis has already run by the
/// time this is called, so a synthesized venue resolves via the map.
pub fn resolve_venue_id(
    event: &NormalizedEvent,
    config: &EventSourceConfig,
    maps: &LookupMaps,
    sampler: &dyn FallbackSampler,
) -> Option<i64> {
    if let Some(id) = config.default_venue_id {
        return Some(id);
    }
    if let Some(id) = lookup_id(event.venue.as_deref(), &maps.venue_map) {
        return Some(id);
    }
    if let Some(id) = lookup_id(config.default_venue_name.as_deref(), &maps.venue_map) {
        return Some(id);
    }
    sampler
        .pick_index(maps.placeholder_venue_ids.len())
        .map(|index| maps.placeholder_venue_ids[index])
}

/// Builds the final insert list. Events that still lack an organizer or a
/// venue id are skipped with a warning; the run continues.
pub fn build_pending_inserts(
    events: Vec<NormalizedEvent>,
    configs: &HashMap<String, EventSourceConfig>,
    maps: &LookupMaps,
    sampler: &dyn FallbackSampler,
) -> Vec<PendingInsert> {
    let mut pending = Vec::new();

    for event in events {
        let Some(config) = configs.get(&event.source_key) else {
            continue;
        };
        let title = event.title.trim().to_string();
        if title.is_empty() {
            continue;
        }

        let Some(venue_id) = resolve_venue_id(&event, config, maps, sampler) else {
            warn!("Unable to resolve venue for event, skipping: {}", title);
            continue;
        };
        let Some(organizer_id) = resolve_organizer_id(&event, config, maps, sampler) else {
            warn!("Unable to resolve organizer for event, skipping: {}", title);
            continue;
        };

        let end_at = if event.end > event.start {
            event.end
        } else {
            event.start + Duration::minutes(60)
        };
        let status = event
            .status
            .or(config.default_status)
            .or_else(|| sampler.pick_status())
            .unwrap_or(EventStatus::Scheduled);
        let categories = normalize::ensure_categories(&event.categories, &config.tags, sampler);

        let payload = InsertEventPayload {
            organizer_id: Some(organizer_id),
            venue_id: Some(venue_id),
            title: title.clone(),
            description: event
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            start_at: event.start,
            end_at,
            status,
        };

        pending.push(PendingInsert {
            source_key: event.source_key.clone(),
            payload,
            categories,
            normalized: event,
        });
    }

    pending
}
