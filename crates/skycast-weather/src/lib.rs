//! Weather service for Skycast
//!
//! Provides forecasts via the Open-Meteo API, city search and reverse
//! geocoding, and a last-known forecast cache.

pub mod cache;
pub mod geocode;
pub mod provider;
pub mod types;

pub use cache::WeatherCache;
pub use geocode::Geocoder;
pub use provider::{WeatherProvider, WeatherSource};
pub use types::*;
