//! ICS calendar adapter.

use crate::config::EventSourceConfig;
use crate::domain::{EventStatus, NormalizedEvent};
use crate::error::{IngestError, Result};
use crate::geocode::Geocoder;
use crate::normalize::{self, FallbackSampler};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use std::io::BufReader;
use tracing::{debug, instrument, warn};

/// Collects events from an ICS calendar source. Components without a summary
/// or a parseable start time are dropped silently.
#[instrument(skip_all, fields(source = %config.key))]
pub async fn collect_events(
    config: &EventSourceConfig,
    geocoder: &dyn Geocoder,
    sampler: &dyn FallbackSampler,
) -> Result<Vec<NormalizedEvent>> {
    let raw = super::load_text(&config.url).await?;
    let mut events = Vec::new();

    for calendar in ical::IcalParser::new(BufReader::new(raw.as_bytes())) {
        let calendar = calendar.map_err(|e| IngestError::Feed {
            message: format!("invalid ICS payload: {e}"),
        })?;
        for component in &calendar.events {
            if let Some(event) = normalize_component(component, config, geocoder, sampler).await {
                events.push(event);
            }
        }
    }

    Ok(events)
}

async fn normalize_component(
    component: &IcalEvent,
    config: &EventSourceConfig,
    geocoder: &dyn Geocoder,
    sampler: &dyn FallbackSampler,
) -> Option<NormalizedEvent> {
    let title = property_text(component, "SUMMARY")?.trim().to_string();
    if title.is_empty() {
        return None;
    }
    let start = property_datetime(component, "DTSTART")?;
    let end = super::ensure_end(
        start,
        property_datetime(component, "DTEND"),
        config.default_duration_minutes,
    );

    let external_id = property_text(component, "UID")
        .filter(|uid| !uid.trim().is_empty())
        .unwrap_or_else(|| super::synthesized_external_id(&title, start));
    // Calendar STATUS wins; the config default only fills silence.
    let status = map_ics_status(find_property(component, "STATUS").and_then(|p| p.value.as_deref()))
        .or(config.default_status);
    let location = normalize::resolve_location(property_text(component, "LOCATION"), sampler);

    let mut event = NormalizedEvent {
        source_key: config.key.clone(),
        external_id,
        title,
        description: property_text(component, "DESCRIPTION"),
        start,
        end,
        categories: normalize::merge_categories(category_values(component), &config.tags),
        organizer: organizer_text(component),
        venue: location.clone().or_else(|| config.default_venue_name.clone()),
        venue_lat: None,
        venue_lon: None,
        venue_street: None,
        venue_city: None,
        venue_state: None,
        venue_postal_code: None,
        status,
    };

    if let Some(address) = location {
        apply_geocoding(&mut event, &address, geocoder).await;
    }

    Some(event)
}

async fn apply_geocoding(event: &mut NormalizedEvent, address: &str, geocoder: &dyn Geocoder) {
    match geocoder.lookup(address).await {
        Ok(Some(found)) => {
            event.venue_lat = Some(found.lat);
            event.venue_lon = Some(found.lon);
            event.venue_street = found.street;
            event.venue_city = found.city;
            event.venue_state = found.state;
            event.venue_postal_code = found.postal_code;
        }
        Ok(None) => debug!("No geocoding match for '{}'", address),
        Err(e) => warn!("Geocoding lookup failed for '{}': {}", address, e),
    }
}

fn find_property<'a>(component: &'a IcalEvent, name: &str) -> Option<&'a Property> {
    component
        .properties
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Reads a text property, unescaping the RFC 5545 sequences calendar
/// emitters actually produce (`\,` `\;` `\n`).
fn property_text(component: &IcalEvent, name: &str) -> Option<String> {
    let value = find_property(component, name)?.value.as_deref()?;
    let text = unescape_text(value);
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') | Some('N') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// ORGANIZER is the least consistent property in the wild: some emitters put
/// a display name in the value, some hide it in a CN parameter, some carry
/// only a mailto. Try every shape before giving up.
fn organizer_text(component: &IcalEvent) -> Option<String> {
    let property = find_property(component, "ORGANIZER")?;

    if let Some(params) = &property.params {
        if let Some((_, values)) = params.iter().find(|(name, _)| name.eq_ignore_ascii_case("CN"))
        {
            if let Some(cn) = values.first() {
                let cn = cn.trim_matches('"').trim();
                if !cn.is_empty() {
                    return Some(cn.to_string());
                }
            }
        }
    }

    let value = property.value.as_deref()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(unescape_text(value))
    }
}

fn property_datetime(component: &IcalEvent, name: &str) -> Option<DateTime<Utc>> {
    let value = find_property(component, name)?.value.as_deref()?;
    parse_ics_datetime(value.trim())
}

/// Parses the ICS date forms seen in real feeds: UTC instants, floating
/// local times (treated as UTC), and all-day dates.
fn parse_ics_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Some(stripped) = value.strip_suffix('Z') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S") {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    super::parse_datetime(value)
}

/// `cancelled` and `tentative` map onto the store's vocabulary; any other
/// present value counts as scheduled. Absent stays `None` so the config
/// default can apply.
fn map_ics_status(status: Option<&str>) -> Option<EventStatus> {
    let normalized = status?.trim().to_lowercase();
    match normalized.as_str() {
        "cancelled" => Some(EventStatus::Cancelled),
        "tentative" => Some(EventStatus::Postponed),
        _ => Some(EventStatus::Scheduled),
    }
}

fn category_values(component: &IcalEvent) -> Vec<String> {
    let mut values = Vec::new();
    for property in component
        .properties
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case("CATEGORIES"))
    {
        if let Some(value) = &property.value {
            for token in value.split(',') {
                let cleaned = strip_category_namespace(token);
                if !cleaned.is_empty() {
                    values.push(cleaned);
                }
            }
        }
    }
    values
}

/// Structured category values arrive as namespaced tokens ("TOPIC:Music");
/// keep the segment after the last colon and collapse whitespace runs.
fn strip_category_namespace(token: &str) -> String {
    let tail = token.rsplit(':').next().unwrap_or(token);
    tail.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ics_datetime_forms_parse() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_ics_datetime("20240301T100000Z"), Some(expected));
        assert_eq!(parse_ics_datetime("20240301T100000"), Some(expected));
        assert_eq!(
            parse_ics_datetime("20240301"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_ics_datetime("garbage"), None);
    }

    #[test]
    fn status_mapping_follows_calendar_vocabulary() {
        assert_eq!(map_ics_status(Some("CANCELLED")), Some(EventStatus::Cancelled));
        assert_eq!(map_ics_status(Some("tentative")), Some(EventStatus::Postponed));
        assert_eq!(map_ics_status(Some("CONFIRMED")), Some(EventStatus::Scheduled));
        assert_eq!(map_ics_status(None), None);
    }

    #[test]
    fn category_namespace_is_stripped_to_last_segment() {
        assert_eq!(strip_category_namespace("TOPIC:Music"), "Music");
        assert_eq!(strip_category_namespace("A:B:C"), "C");
        assert_eq!(strip_category_namespace("  Live   Music  "), "Live Music");
        assert_eq!(strip_category_namespace("Plain"), "Plain");
    }

    #[test]
    fn text_unescaping_handles_rfc5545_sequences() {
        assert_eq!(unescape_text(r"Hall A\, Building 2"), "Hall A, Building 2");
        assert_eq!(unescape_text(r"line one\nline two"), "line one\nline two");
        assert_eq!(unescape_text(r"semi\;colon"), "semi;colon");
    }

    fn component_with(properties: Vec<Property>) -> IcalEvent {
        let mut component = IcalEvent::default();
        component.properties = properties;
        component
    }

    fn property(name: &str, value: &str) -> Property {
        Property {
            name: name.to_string(),
            params: None,
            value: Some(value.to_string()),
        }
    }

    #[test]
    fn organizer_prefers_cn_parameter() {
        let mut organizer = property("ORGANIZER", "mailto:events@example.edu");
        organizer.params = Some(vec![(
            "CN".to_string(),
            vec!["Campus Events Office".to_string()],
        )]);
        let component = component_with(vec![organizer]);
        assert_eq!(
            organizer_text(&component),
            Some("Campus Events Office".to_string())
        );
    }

    #[test]
    fn organizer_falls_back_to_plain_value() {
        let component = component_with(vec![property("ORGANIZER", "Student Union")]);
        assert_eq!(organizer_text(&component), Some("Student Union".to_string()));
        assert_eq!(organizer_text(&component_with(vec![])), None);
    }

    #[test]
    fn categories_tokenize_across_properties() {
        let component = component_with(vec![
            property("CATEGORIES", "TOPIC:Music,Dance"),
            property("CATEGORIES", "CAMPUS:  Open   Mic "),
        ]);
        assert_eq!(category_values(&component), vec!["Music", "Dance", "Open Mic"]);
    }
}
