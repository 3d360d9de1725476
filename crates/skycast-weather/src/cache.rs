//! Last-known forecast cache, used when the provider is unreachable.

use crate::types::{Forecast, WeatherError};
use chrono::{Duration, Utc};
use std::path::{Path, PathBuf};

const CACHE_FILE: &str = "weather_cache.json";

#[derive(Debug)]
pub struct WeatherCache {
    cache_path: PathBuf,
    data: Option<Forecast>,
}

impl WeatherCache {
    pub fn new(data_dir: &Path) -> Self {
        let cache_path = data_dir.join(CACHE_FILE);
        Self {
            cache_path,
            data: None,
        }
    }

    /// Persist `forecast` and keep it in memory.
    pub fn store(&mut self, forecast: &Forecast) -> Result<(), WeatherError> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WeatherError::Cache(format!("create {:?}: {}", parent, e)))?;
        }

        let json = serde_json::to_string(forecast)
            .map_err(|e| WeatherError::Cache(e.to_string()))?;
        std::fs::write(&self.cache_path, json)
            .map_err(|e| WeatherError::Cache(format!("write {:?}: {}", self.cache_path, e)))?;

        self.data = Some(forecast.clone());
        tracing::debug!("Cached forecast at {:?}", self.cache_path);
        Ok(())
    }

    /// Cached forecast regardless of age.
    pub fn load_any(&mut self) -> Option<Forecast> {
        if self.data.is_none() {
            self.data = self.read_file();
        }
        self.data.clone()
    }

    /// Cached forecast only if fetched within `max_age`.
    pub fn load_fresh(&mut self, max_age: Duration) -> Option<Forecast> {
        self.load_any()
            .filter(|f| Utc::now().signed_duration_since(f.fetched_at) <= max_age)
    }

    fn read_file(&self) -> Option<Forecast> {
        let json = match std::fs::read_to_string(&self.cache_path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read weather cache: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                tracing::warn!("Discarding corrupted weather cache: {}", e);
                None
            }
        }
    }
}
