use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather and geocoding provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Reminder scheduling settings
    #[serde(default)]
    pub reminders: ReminderConfig,

    /// Local persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Open-Meteo forecast endpoint
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Open-Meteo geocoding (city search) endpoint
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Nominatim reverse geocoding endpoint
    #[serde(default = "default_reverse_geocoding_url")]
    pub reverse_geocoding_url: String,

    /// Number of forecast days requested
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,

    /// Timezone passed to the provider ("auto" resolves from coordinates)
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Location used when the device location is unknown
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,
    #[serde(default = "default_longitude")]
    pub default_longitude: f64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Age after which a cached forecast counts as stale
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_minutes: u32,
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_reverse_geocoding_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_forecast_days() -> u8 {
    7
}

fn default_timezone() -> String {
    "auto".to_string()
}

fn default_latitude() -> f64 {
    16.1667
}

fn default_longitude() -> f64 {
    107.8333
}

fn default_request_timeout() -> u64 {
    10
}

fn default_cache_max_age() -> u32 {
    180
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: default_forecast_url(),
            geocoding_url: default_geocoding_url(),
            reverse_geocoding_url: default_reverse_geocoding_url(),
            forecast_days: default_forecast_days(),
            timezone: default_timezone(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            request_timeout_secs: default_request_timeout(),
            cache_max_age_minutes: default_cache_max_age(),
        }
    }
}

/// How reminder triggers are handed to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Delay in seconds until the next occurrence, fires once
    #[default]
    OneShot,
    /// Hour/minute with the repeat flag, the platform computes occurrences
    Daily,
}

/// How a reschedule pass reconciles with what is already pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStrategy {
    /// Track handles per reminder time and only touch what changed
    #[default]
    Diff,
    /// Cancel every pending notification, then schedule the full set
    CancelAll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Optional cap on configured reminder times. `None` means no cap.
    #[serde(default)]
    pub max_times: Option<usize>,

    #[serde(default)]
    pub trigger_mode: TriggerMode,

    #[serde(default)]
    pub strategy: RescheduleStrategy,

    /// Use the hourly forecast at fire time instead of current conditions
    #[serde(default = "default_true")]
    pub forecast_adjust: bool,

    /// Platform notification channel
    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    #[serde(default = "default_cold_below")]
    pub cold_below_celsius: f64,

    #[serde(default = "default_hot_above")]
    pub hot_above_celsius: f64,

    #[serde(default = "default_uv_above")]
    pub uv_above: f64,

    /// Only suggest sun protection on clear or partly cloudy days
    #[serde(default = "default_true")]
    pub hot_requires_clear_sky: bool,
}

fn default_true() -> bool {
    true
}

fn default_channel_id() -> String {
    "weather-updates".to_string()
}

fn default_cold_below() -> f64 {
    15.0
}

fn default_hot_above() -> f64 {
    30.0
}

fn default_uv_above() -> f64 {
    5.0
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            max_times: None,
            trigger_mode: TriggerMode::default(),
            strategy: RescheduleStrategy::default(),
            forecast_adjust: true,
            channel_id: default_channel_id(),
            cold_below_celsius: default_cold_below(),
            hot_above_celsius: default_hot_above(),
            uv_above: default_uv_above(),
            hot_requires_clear_sky: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the key/value store and the forecast cache
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            reminders: ReminderConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);
        self.validate_url(&self.weather.geocoding_url, "weather.geocoding_url", &mut result);
        self.validate_url(
            &self.weather.reverse_geocoding_url,
            "weather.reverse_geocoding_url",
            &mut result,
        );

        if self.weather.forecast_days == 0 {
            result.add_error("weather.forecast_days", "At least one forecast day is required");
        } else if self.weather.forecast_days > 16 {
            result.add_error("weather.forecast_days", "Open-Meteo serves at most 16 forecast days");
        }

        if !(-90.0..=90.0).contains(&self.weather.default_latitude) {
            result.add_error("weather.default_latitude", "Latitude must be within [-90, 90]");
        }
        if !(-180.0..=180.0).contains(&self.weather.default_longitude) {
            result.add_error("weather.default_longitude", "Longitude must be within [-180, 180]");
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error("weather.request_timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        if self.weather.cache_max_age_minutes == 0 {
            result.add_warning(
                "weather.cache_max_age_minutes",
                "Forecast cache disabled (0 minutes)",
            );
        }

        match self.reminders.max_times {
            Some(0) => result.add_error(
                "reminders.max_times",
                "A cap of 0 would forbid every reminder time",
            ),
            Some(n) if n > 24 => result.add_warning(
                "reminders.max_times",
                format!("Cap of {} reminder times is unusually large", n),
            ),
            _ => {}
        }

        if self.reminders.channel_id.trim().is_empty() {
            result.add_error("reminders.channel_id", "Channel id must not be empty");
        }

        if self.reminders.cold_below_celsius >= self.reminders.hot_above_celsius {
            result.add_warning(
                "reminders.cold_below_celsius",
                "Cold threshold is not below the hot threshold",
            );
        }

        if self.reminders.uv_above < 0.0 {
            result.add_error("reminders.uv_above", "UV threshold cannot be negative");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
