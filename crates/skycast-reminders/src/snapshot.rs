//! Weather values used to compose a single reminder.

use chrono::{DateTime, FixedOffset};
use skycast_weather::{Forecast, HourlyForecast, TemperatureUnit, WeatherCondition};

use crate::error::ReminderError;
use crate::schedule::forecast_index;

/// Conditions at one moment. Built fresh on every scheduling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub temperature: f64,
    pub temperature_unit: TemperatureUnit,
    pub weather_code: Option<i32>,
    pub uv_index: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
}

impl WeatherSnapshot {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.weather_code)
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.temperature_unit.to_celsius(self.temperature)
    }

    /// Replace the weather values with a forecast entry, keeping location.
    ///
    /// Returns `None` when the entry has no temperature.
    fn with_hour(&self, hour: &HourlyForecast) -> Option<Self> {
        let temperature = hour.temperature?;
        Some(Self {
            temperature,
            weather_code: hour.weather_code,
            uv_index: hour.uv_index,
            ..self.clone()
        })
    }
}

/// The current snapshot plus the hourly series starting at the current hour.
#[derive(Debug, Clone)]
pub struct WeatherContext {
    pub current: WeatherSnapshot,
    pub hourly: Vec<HourlyForecast>,
}

impl WeatherContext {
    /// Build a context from a provider forecast as seen at `now`.
    ///
    /// `now` may be in any offset; the forecast converts it to the
    /// location's wall clock before picking the current hour.
    pub fn from_forecast(
        forecast: &Forecast,
        location_name: impl Into<String>,
        now: DateTime<FixedOffset>,
    ) -> Result<Self, ReminderError> {
        let hourly = forecast.hourly_from(now);
        let first = hourly
            .first()
            .ok_or_else(|| ReminderError::NoWeatherData("forecast has no hourly data".into()))?;
        let temperature = first.temperature.ok_or_else(|| {
            ReminderError::NoWeatherData(format!("no temperature for {}", first.time))
        })?;

        let current = WeatherSnapshot {
            location_name: location_name.into(),
            temperature,
            temperature_unit: forecast.temperature_unit,
            weather_code: first.weather_code,
            uv_index: first.uv_index,
            latitude: forecast.location.latitude,
            longitude: forecast.location.longitude,
        };

        Ok(Self {
            current,
            hourly: hourly.to_vec(),
        })
    }

    /// A context with no forecast; every reminder uses `current`.
    pub fn current_only(current: WeatherSnapshot) -> Self {
        Self {
            current,
            hourly: Vec::new(),
        }
    }

    /// Expected conditions `offset_hours` from now.
    ///
    /// Offsets past either end of the series are clamped. A missing series
    /// or an entry without a temperature yields the current snapshot.
    pub fn snapshot_at(&self, offset_hours: i64) -> WeatherSnapshot {
        forecast_index(offset_hours, self.hourly.len())
            .and_then(|i| self.current.with_hour(&self.hourly[i]))
            .unwrap_or_else(|| self.current.clone())
    }
}
