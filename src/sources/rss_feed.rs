//! RSS adapter. RSS carries no structured organizer/venue, so those come
//! from the source config alone.

use crate::config::EventSourceConfig;
use crate::constants::DEFAULT_RSS_DURATION_MINUTES;
use crate::domain::NormalizedEvent;
use crate::error::{IngestError, Result};
use crate::normalize;
use rss::Channel;
use tracing::{debug, instrument};

#[instrument(skip_all, fields(source = %config.key))]
pub async fn collect_events(config: &EventSourceConfig) -> Result<Vec<NormalizedEvent>> {
    let raw = super::load_text(&config.url).await?;
    let channel = Channel::read_from(raw.as_bytes()).map_err(|e| IngestError::Feed {
        message: format!("invalid RSS payload: {e}"),
    })?;

    let fallback_minutes = config
        .default_duration_minutes
        .unwrap_or(DEFAULT_RSS_DURATION_MINUTES);

    let mut events = Vec::new();
    for item in channel.items() {
        let Some(title) = item.title().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        let Some(start) = item.pub_date().and_then(super::parse_datetime) else {
            debug!("Skipping item '{}' without a parseable date", title);
            continue;
        };
        let end = super::ensure_end(start, None, Some(fallback_minutes));

        let external_id = item
            .guid()
            .map(|guid| guid.value().to_string())
            .or_else(|| item.link().map(str::to_string))
            .unwrap_or_else(|| super::synthesized_external_id(title, start));

        let categories = normalize::merge_categories(
            item.categories()
                .iter()
                .map(|category| category.name().to_string()),
            &config.tags,
        );

        events.push(NormalizedEvent {
            source_key: config.key.clone(),
            external_id,
            title: title.to_string(),
            // Some feeds put the body in content:encoded instead of the
            // description element.
            description: item
                .description()
                .or_else(|| item.content())
                .map(str::to_string),
            start,
            end,
            categories,
            organizer: config.default_organizer_name.clone(),
            venue: config.default_venue_name.clone(),
            venue_lat: None,
            venue_lon: None,
            venue_street: None,
            venue_city: None,
            venue_state: None,
            venue_postal_code: None,
            status: config.default_status,
        });
    }

    Ok(events)
}
