//! Open-Meteo forecast provider.
//!
//! Open-Meteo returns each variable as a parallel array aligned with a
//! timestamp array; this module zips them into per-hour and per-day records.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::types::{DailyForecast, Forecast, HourlyForecast, Location, TemperatureUnit, WeatherError};

pub const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const REQUEST_TIMEOUT_SECS: u64 = 10;

const HOURLY_VARIABLES: &str = "temperature_2m,relative_humidity_2m,precipitation,weather_code,wind_speed_10m,wind_direction_10m,uv_index,is_day";
const DAILY_VARIABLES: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,weather_code,uv_index_max,sunset";

/// Anything that can produce a forecast for a location.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch current, hourly and daily data for `location`.
    async fn fetch_forecast(&self, location: &Location) -> Result<Forecast, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    unit: TemperatureUnit,
    forecast_days: u8,
    timezone: String,
}

impl WeatherProvider {
    pub fn new(unit: TemperatureUnit) -> Result<Self, WeatherError> {
        Self::with_options(
            OPEN_METEO_FORECAST_URL,
            unit,
            7,
            "auto",
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_options(
        base_url: &str,
        unit: TemperatureUnit,
        forecast_days: u8,
        timezone: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            unit,
            forecast_days,
            timezone: timezone.to_string(),
        })
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    #[instrument(skip(self), level = "info")]
    async fn request(&self, location: &Location) -> Result<OpenMeteoResponse, WeatherError> {
        let forecast_days = self.forecast_days.to_string();
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("hourly", HOURLY_VARIABLES),
                ("daily", DAILY_VARIABLES),
                ("timezone", self.timezone.as_str()),
                ("forecast_days", forecast_days.as_str()),
                ("temperature_unit", self.unit.api_name()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<OpenMeteoErrorBody>()
                .await
                .map(|b| b.reason)
                .unwrap_or_else(|_| status.to_string());
            tracing::warn!("Forecast request failed with {}: {}", status, message);
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<OpenMeteoResponse>()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))
    }
}

#[async_trait]
impl WeatherSource for WeatherProvider {
    async fn fetch_forecast(&self, location: &Location) -> Result<Forecast, WeatherError> {
        let body = self.request(location).await?;
        let forecast = body.into_forecast(location, self.unit)?;
        tracing::info!(
            "Fetched forecast for {}: {} hourly, {} daily entries",
            location.display_name(),
            forecast.hourly.len(),
            forecast.daily.len()
        );
        Ok(forecast)
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoErrorBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    utc_offset_seconds: Option<i32>,
    hourly: Option<HourlyBlock>,
    daily: Option<DailyBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    uv_index: Vec<Option<f64>>,
    #[serde(default)]
    is_day: Vec<Option<u8>>,
}

#[derive(Debug, Default, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    uv_index_max: Vec<Option<f64>>,
    #[serde(default)]
    sunset: Vec<Option<String>>,
}

/// Value at `i` of a parallel array; short arrays read as missing.
fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

fn parse_hour(s: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .map_err(|e| WeatherError::Parse(format!("bad timestamp {:?}: {}", s, e)))
}

fn parse_day(s: &str) -> Result<NaiveDate, WeatherError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| WeatherError::Parse(format!("bad date {:?}: {}", s, e)))
}

impl OpenMeteoResponse {
    fn into_forecast(
        self,
        location: &Location,
        unit: TemperatureUnit,
    ) -> Result<Forecast, WeatherError> {
        let hourly_block = self.hourly.unwrap_or_default();
        let hourly = hourly_block
            .time
            .iter()
            .enumerate()
            .map(|(i, time)| -> Result<HourlyForecast, WeatherError> {
                Ok(HourlyForecast {
                    time: parse_hour(time)?,
                    temperature: at(&hourly_block.temperature_2m, i),
                    relative_humidity: at(&hourly_block.relative_humidity_2m, i),
                    precipitation: at(&hourly_block.precipitation, i),
                    weather_code: at(&hourly_block.weather_code, i),
                    wind_speed: at(&hourly_block.wind_speed_10m, i),
                    wind_direction: at(&hourly_block.wind_direction_10m, i),
                    uv_index: at(&hourly_block.uv_index, i),
                    is_day: at(&hourly_block.is_day, i).map(|d| d != 0),
                })
            })
            .collect::<Result<Vec<_>, WeatherError>>()?;

        let daily_block = self.daily.unwrap_or_default();
        let daily = daily_block
            .time
            .iter()
            .enumerate()
            .map(|(i, date)| -> Result<DailyForecast, WeatherError> {
                let sunset = match daily_block.sunset.get(i).and_then(|s| s.as_deref()) {
                    Some(s) => Some(parse_hour(s)?),
                    None => None,
                };
                Ok(DailyForecast {
                    date: parse_day(date)?,
                    temperature_max: at(&daily_block.temperature_2m_max, i),
                    temperature_min: at(&daily_block.temperature_2m_min, i),
                    precipitation_sum: at(&daily_block.precipitation_sum, i),
                    weather_code: at(&daily_block.weather_code, i),
                    uv_index_max: at(&daily_block.uv_index_max, i),
                    sunset,
                })
            })
            .collect::<Result<Vec<_>, WeatherError>>()?;

        Ok(Forecast {
            location: location.clone(),
            timezone: self.timezone.unwrap_or_else(|| "GMT".to_string()),
            utc_offset_seconds: self.utc_offset_seconds,
            temperature_unit: unit,
            hourly,
            daily,
            fetched_at: Utc::now(),
        })
    }
}
