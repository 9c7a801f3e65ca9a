//! OpenStreetMap Nominatim search client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use sietsemap_shared::{Coordinates, GeocoderConfig, Result, SietsemapError};

use crate::Geocoder;
use crate::limiter::RateLimiter;

/// One hit from `/search?format=json`. Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Geocoder backed by the Nominatim `/search` endpoint.
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
    limiter: RateLimiter,
}

impl NominatimGeocoder {
    /// Build a client from the `[geocoder]` config section.
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            SietsemapError::config(format!("invalid geocoder base_url '{}': {e}", config.base_url))
        })?;
        let mut search_url = base.clone();
        search_url
            .path_segments_mut()
            .map_err(|_| {
                SietsemapError::config(format!("geocoder base_url '{base}' cannot have a path"))
            })?
            .pop_if_empty()
            .push("search");

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SietsemapError::Geocode(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            search_url,
            limiter: RateLimiter::from_millis(config.rate_limit_ms),
        })
    }

    fn request_url(&self, address: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }
}

impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        self.limiter.wait().await;

        let response = self
            .client
            .get(self.request_url(address))
            .send()
            .await
            .map_err(|e| SietsemapError::Geocode(format!("{address}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SietsemapError::Geocode(format!("{address}: HTTP {status}")));
        }

        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|e| SietsemapError::Geocode(format!("{address}: bad response: {e}")))?;

        let Some(hit) = hits.into_iter().next() else {
            debug!("no match");
            return Ok(None);
        };

        let coords = parse_hit(&hit)
            .ok_or_else(|| SietsemapError::Geocode(format!("{address}: unparseable coordinates")))?;

        debug!(lat = coords.lat, lon = coords.lon, "geocoded");
        Ok(Some(coords))
    }
}

fn parse_hit(hit: &SearchHit) -> Option<Coordinates> {
    Some(Coordinates {
        lat: hit.lat.trim().parse().ok()?,
        lon: hit.lon.trim().parse().ok()?,
    })
}
