//! Free-text address lookup. No-match is `Ok(None)`, never an error; the
//! pipeline proceeds without enrichment either way.

use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub lat: f64,
    pub lon: f64,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, address: &str) -> Result<Option<GeocodedAddress>>;
}

/// Nominatim-backed geocoder.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self::with_base_url("https://nominatim.openstreetmap.org")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    #[serde(default)]
    house_number: Option<String>,
    #[serde(default)]
    road: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn lookup(&self, address: &str) -> Result<Option<GeocodedAddress>> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", address),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .header(reqwest::header::USER_AGENT, "event_harvester/0.1")
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "Geocoding request for '{}' returned status {}",
                address,
                response.status()
            );
            return Ok(None);
        }

        let results: Vec<NominatimResult> = response.json().await?;
        let Some(first) = results.into_iter().next() else {
            return Ok(None);
        };
        let (Ok(lat), Ok(lon)) = (first.lat.parse::<f64>(), first.lon.parse::<f64>()) else {
            return Ok(None);
        };

        let street = match (&first.address.house_number, &first.address.road) {
            (Some(number), Some(road)) => Some(format!("{number} {road}")),
            (None, Some(road)) => Some(road.clone()),
            _ => None,
        };
        let city = first
            .address
            .city
            .or(first.address.town)
            .or(first.address.village);

        Ok(Some(GeocodedAddress {
            lat,
            lon,
            street,
            city,
            state: first.address.state,
            postal_code: first.address.postcode,
        }))
    }
}

/// Memoizing wrapper keyed by the lowercased, trimmed address. The cache
/// lives for the whole process and is unbounded; acceptable while the feeds'
/// venue vocabulary stays small, a growth risk otherwise.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Mutex<HashMap<String, Option<GeocodedAddress>>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn lookup(&self, address: &str) -> Result<Option<GeocodedAddress>> {
        let key = address.trim().to_lowercase();
        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            debug!("Geocode cache hit for '{}'", key);
            return Ok(hit.clone());
        }

        // Real answers (including no-match) are cached; transport errors are
        // not, so the next event retries the lookup.
        let result = self.inner.lookup(address).await?;
        self.cache.lock().unwrap().insert(key, result.clone());
        Ok(result)
    }
}

/// Geocoder that never matches. Used in tests and dry runs.
pub struct NullGeocoder;

#[async_trait]
impl Geocoder for NullGeocoder {
    async fn lookup(&self, _address: &str) -> Result<Option<GeocodedAddress>> {
        Ok(None)
    }
}
