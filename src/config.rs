//! Source and runtime configuration, loaded from TOML with env overrides.

use crate::constants::{DEFAULT_LOOKBACK_DAYS, DEFAULT_POLL_MINUTES};
use crate::domain::EventStatus;
use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Ics,
    Rss,
    Json,
}

/// Per-feed configuration block (`[[source]]` in the TOML file).
#[derive(Debug, Clone, Deserialize)]
pub struct EventSourceConfig {
    pub key: String,
    pub kind: SourceKind,
    /// http(s) URL, `file://` URL, or a path relative to the working dir.
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Static tags applied when a feed supplies no categories of its own.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub default_duration_minutes: Option<i64>,
    #[serde(default)]
    pub default_status: Option<EventStatus>,
    #[serde(default)]
    pub default_organizer_id: Option<i64>,
    #[serde(default)]
    pub default_organizer_name: Option<String>,
    #[serde(default)]
    pub default_venue_id: Option<i64>,
    #[serde(default)]
    pub default_venue_name: Option<String>,
}

/// Runtime knobs (`[settings]` in the TOML file).
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSettings {
    #[serde(default = "default_poll_minutes")]
    pub poll_minutes: u64,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// When true, unresolved organizers/venues/categories fall back to the
    /// placeholder pools instead of dropping data. Keep this off in
    /// production.
    #[serde(default)]
    pub demo_fallbacks: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            poll_minutes: DEFAULT_POLL_MINUTES,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            demo_fallbacks: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: IngestSettings,
    #[serde(default, rename = "source")]
    pub sources: Vec<EventSourceConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config: Config = toml::from_str(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// `INGEST_POLL_MINUTES` and `INGEST_LOOKBACK_DAYS` win over the file.
    fn apply_env_overrides(&mut self) {
        if let Some(minutes) = env_positive_int("INGEST_POLL_MINUTES") {
            self.settings.poll_minutes = minutes;
        }
        if let Some(days) = env_positive_int("INGEST_LOOKBACK_DAYS") {
            self.settings.lookback_days = days as i64;
        }
    }
}

fn env_positive_int(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|v| *v > 0)
}

fn default_enabled() -> bool {
    true
}

fn default_poll_minutes() -> u64 {
    DEFAULT_POLL_MINUTES
}

fn default_lookback_days() -> i64 {
    DEFAULT_LOOKBACK_DAYS
}
