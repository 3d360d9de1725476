use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Short symbol shown after the degree sign
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }

    /// Name used in Open-Meteo query parameters
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }

    /// Convert a Celsius reading into this unit
    pub fn convert_from_celsius(&self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Convert a reading expressed in this unit into Celsius
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            Self::Celsius => value,
            Self::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

/// Wind speed unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindUnit {
    #[default]
    Kmh,
    Mph,
}

impl WindUnit {
    /// Convert a km/h reading into this unit
    pub fn convert_from_kmh(&self, kmh: f64) -> f64 {
        match self {
            Self::Kmh => kmh,
            Self::Mph => kmh / 1.609,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Kmh => "km/h",
            Self::Mph => "mph",
        }
    }
}

/// Weather conditions keyed by WMO weather code.
///
/// Closed vocabulary: any code outside the table, or a missing code,
/// is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    FreezingFog,
    LightDrizzle,
    ModerateDrizzle,
    DenseDrizzle,
    LightRain,
    ModerateRain,
    HeavyRain,
    LightShowers,
    ModerateShowers,
    ViolentShowers,
    Thunderstorm,
    ThunderstormSlightHail,
    ThunderstormHeavyHail,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 => Self::Fog,
            48 => Self::FreezingFog,
            51 => Self::LightDrizzle,
            53 => Self::ModerateDrizzle,
            55 => Self::DenseDrizzle,
            61 => Self::LightRain,
            63 => Self::ModerateRain,
            65 => Self::HeavyRain,
            80 => Self::LightShowers,
            81 => Self::ModerateShowers,
            82 => Self::ViolentShowers,
            95 => Self::Thunderstorm,
            96 => Self::ThunderstormSlightHail,
            99 => Self::ThunderstormHeavyHail,
            _ => Self::Unknown,
        }
    }

    /// Map an optional code. Zero is a real code (clear sky), only `None` is missing.
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(code) => Self::from_wmo_code(code),
            None => Self::Unknown,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear sky",
            Self::MainlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::FreezingFog => "Freezing fog",
            Self::LightDrizzle => "Light drizzle",
            Self::ModerateDrizzle => "Moderate drizzle",
            Self::DenseDrizzle => "Dense drizzle",
            Self::LightRain => "Light rain",
            Self::ModerateRain => "Moderate rain",
            Self::HeavyRain => "Heavy rain",
            Self::LightShowers => "Light rain showers",
            Self::ModerateShowers => "Moderate rain showers",
            Self::ViolentShowers => "Violent rain showers",
            Self::Thunderstorm => "Thunderstorm",
            Self::ThunderstormSlightHail => "Thunderstorm with slight hail",
            Self::ThunderstormHeavyHail => "Thunderstorm with heavy hail",
            Self::Unknown => "Unknown conditions",
        }
    }

    /// Rain, drizzle, showers or thunderstorms
    pub fn is_wet(&self) -> bool {
        matches!(
            self,
            Self::LightDrizzle
                | Self::ModerateDrizzle
                | Self::DenseDrizzle
                | Self::LightRain
                | Self::ModerateRain
                | Self::HeavyRain
                | Self::LightShowers
                | Self::ModerateShowers
                | Self::ViolentShowers
                | Self::Thunderstorm
                | Self::ThunderstormSlightHail
                | Self::ThunderstormHeavyHail
        )
    }

    /// WMO codes 0 and 2 only; "mainly clear" (1) does not count.
    pub fn is_clear_or_partly_cloudy(&self) -> bool {
        matches!(self, Self::Clear | Self::PartlyCloudy)
    }
}

/// Geographic location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city_name: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            city_name: None,
        }
    }

    pub fn named(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            city_name: Some(name.into()),
        }
    }

    /// City name if known, otherwise rounded coordinates
    pub fn display_name(&self) -> String {
        match &self.city_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{:.2}, {:.2}", self.latitude, self.longitude),
        }
    }
}

/// City returned from a geocoding search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
}

impl City {
    pub fn location(&self) -> Location {
        Location::named(self.latitude, self.longitude, self.name.clone())
    }
}

/// Hourly forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: NaiveDateTime,
    pub temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub weather_code: Option<i32>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub uv_index: Option<f64>,
    pub is_day: Option<bool>,
}

impl HourlyForecast {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.weather_code)
    }
}

/// Daily forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub precipitation_sum: Option<f64>,
    pub weather_code: Option<i32>,
    pub uv_index_max: Option<f64>,
    pub sunset: Option<NaiveDateTime>,
}

impl DailyForecast {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.weather_code)
    }
}

/// Complete forecast bundle for one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub location: Location,
    pub timezone: String,
    /// Offset of the location's wall clock from UTC, as reported by the provider.
    #[serde(default)]
    pub utc_offset_seconds: Option<i32>,
    pub temperature_unit: TemperatureUnit,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
    pub fetched_at: DateTime<Utc>,
}

impl Forecast {
    pub fn offset(&self) -> Option<FixedOffset> {
        self.utc_offset_seconds.and_then(FixedOffset::east_opt)
    }

    /// `now` on the forecast location's wall clock.
    ///
    /// Without a known offset the series is assumed to share the caller's zone.
    pub fn local_time(&self, now: DateTime<FixedOffset>) -> NaiveDateTime {
        match self.offset() {
            Some(offset) => now.with_timezone(&offset).naive_local(),
            None => now.naive_local(),
        }
    }

    /// Hourly entries starting at the hour containing `now`.
    ///
    /// Series times are the location's wall clock, so `now` is shifted into
    /// the forecast's offset first. Index 0 of the returned slice is the
    /// current hour. If `now` is outside the series the whole series is
    /// returned.
    pub fn hourly_from(&self, now: DateTime<FixedOffset>) -> &[HourlyForecast] {
        let local = self.local_time(now);
        let hour_start = local
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(local);

        match self.hourly.iter().position(|h| h.time >= hour_start) {
            Some(start) => &self.hourly[start..],
            None => &self.hourly,
        }
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
