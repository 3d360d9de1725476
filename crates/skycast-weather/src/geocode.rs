//! Geocoding: city search by name and reverse lookup of coordinates.
//!
//! Search uses the Open-Meteo geocoding API; reverse lookup uses Nominatim
//! (OpenStreetMap). Both are free and need no API key.

use crate::types::{City, Location, WeatherError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

pub const OPEN_METEO_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const SEARCH_RESULT_COUNT: &str = "10";
const USER_AGENT: &str = "Skycast/0.1.0";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<SearchResult>>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: i64,
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    search_url: String,
    reverse_url: String,
}

impl Geocoder {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_urls(
            OPEN_METEO_GEOCODING_URL,
            NOMINATIM_URL,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_urls(
        search_url: &str,
        reverse_url: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            search_url: search_url.trim_end_matches('/').to_string(),
            reverse_url: reverse_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search cities by free-text name. A blank query returns no results
    /// without touching the network.
    #[instrument(skip(self), level = "info")]
    pub async fn search_city(&self, query: &str) -> Result<Vec<City>, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(&self.search_url)
            .query(&[("name", query), ("count", SEARCH_RESULT_COUNT)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message: status.to_string(),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        let cities: Vec<City> = body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|r| City {
                id: r.id,
                name: r.name,
                latitude: r.latitude,
                longitude: r.longitude,
                country: r.country,
            })
            .collect();

        tracing::debug!("City search {:?} returned {} results", query, cities.len());
        Ok(cities)
    }

    /// Reverse geocode coordinates to a human-readable place name (e.g. "Hue, Thua Thien Hue").
    /// Returns `None` on failure or timeout; the caller can fall back to coordinates.
    pub async fn reverse(&self, location: &Location) -> Option<String> {
        if location.city_name.is_some() {
            return location.city_name.clone();
        }

        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        let response = match self
            .client
            .get(&self.reverse_url)
            .query(&[
                ("lat", latitude.as_str()),
                ("lon", longitude.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("layer", "address"),
                ("zoom", "10"),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: NominatimResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode parse error: {}", e);
                return None;
            }
        };

        let result = place_name(body.address?)?;
        tracing::info!("Reverse geocoded to: {}", result);
        Some(result)
    }
}

/// Prefer city > town > village > municipality, then add state or
/// country when it differs from the place itself.
fn place_name(addr: NominatimAddress) -> Option<String> {
    let state = addr.state.clone();
    let country = addr.country.clone();

    let place = addr
        .city
        .or(addr.town)
        .or(addr.village)
        .or(addr.municipality)
        .or(addr.state_district)
        .or(addr.county)
        .or(addr.state)
        .or(addr.country)?;

    let suffix = [state, country]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty() && *s != place);

    Some(match suffix {
        Some(s) => format!("{}, {}", place, s),
        None => place,
    })
}
