//! Source adapters. One per feed format; each fetches raw data and emits
//! [`NormalizedEvent`]s. Adapters run concurrently and fail independently: a
//! broken feed logs a warning and contributes zero events to the batch.

pub mod ics;
pub mod json_feed;
pub mod rss_feed;

use crate::config::{EventSourceConfig, SourceKind};
use crate::constants::DEFAULT_DURATION_MINUTES;
use crate::domain::NormalizedEvent;
use crate::error::{IngestError, Result};
use crate::geocode::Geocoder;
use crate::normalize::FallbackSampler;
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Fetches every source concurrently. Failures are isolated per adapter so
/// one bad feed never blocks the others.
pub async fn fetch_all_sources(
    configs: &[EventSourceConfig],
    geocoder: Arc<dyn Geocoder>,
    sampler: Arc<dyn FallbackSampler>,
) -> Vec<NormalizedEvent> {
    let mut handles = Vec::with_capacity(configs.len());
    for config in configs.iter().cloned() {
        let geocoder = geocoder.clone();
        let sampler = sampler.clone();
        handles.push(tokio::spawn(async move {
            match collect_source_events(&config, geocoder.as_ref(), sampler.as_ref()).await {
                Ok(events) => {
                    info!("Fetched {} events from {}", events.len(), config.key);
                    events
                }
                Err(e) => {
                    warn!("Failed to collect {}: {}", config.key, e);
                    Vec::new()
                }
            }
        }));
    }

    let mut all_events = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(events) => all_events.extend(events),
            Err(e) => warn!("Source task panicked: {}", e),
        }
    }
    all_events
}

/// Dispatches to the adapter for the config's feed kind. Disabled sources
/// contribute nothing.
pub async fn collect_source_events(
    config: &EventSourceConfig,
    geocoder: &dyn Geocoder,
    sampler: &dyn FallbackSampler,
) -> Result<Vec<NormalizedEvent>> {
    if !config.enabled {
        return Ok(Vec::new());
    }
    match config.kind {
        SourceKind::Ics => ics::collect_events(config, geocoder, sampler).await,
        SourceKind::Rss => rss_feed::collect_events(config).await,
        SourceKind::Json => json_feed::collect_events(config).await,
    }
}

/// Returns `end` when it is a real instant after `start`; otherwise start
/// plus the fallback duration (60 minutes unless the config overrides it).
pub(crate) fn ensure_end(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    fallback_minutes: Option<i64>,
) -> DateTime<Utc> {
    match end {
        Some(end) if end > start => end,
        _ => start + Duration::minutes(fallback_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)),
    }
}

/// Feed-provided id, or `title-startISO` when the feed gives none.
pub(crate) fn synthesized_external_id(title: &str, start: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        title,
        start.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Best-effort timestamp parsing for the formats feeds actually emit:
/// RFC 3339, RFC 2822, and naive `YYYY-MM-DDTHH:MM:SS` treated as UTC.
pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&parsed));
    }
    None
}

fn is_http(reference: &str) -> bool {
    let lower = reference.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `file://` URLs become plain paths; relative paths resolve against the
/// working directory.
pub(crate) fn resolve_local_path(reference: &str) -> PathBuf {
    if let Some(stripped) = reference.strip_prefix("file://") {
        return PathBuf::from(stripped);
    }
    let path = Path::new(reference);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

async fn read_local(reference: &str) -> Result<String> {
    Ok(tokio::fs::read_to_string(resolve_local_path(reference)).await?)
}

async fn fetch_text(url: &str) -> Result<String> {
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(IngestError::Feed {
            message: format!("{} returned status {}", url, response.status()),
        });
    }
    Ok(response.text().await?)
}

/// Loads raw feed text from a network URL or the local filesystem.
pub(crate) async fn load_text(reference: &str) -> Result<String> {
    if is_http(reference) {
        fetch_text(reference).await
    } else {
        read_local(reference).await
    }
}
