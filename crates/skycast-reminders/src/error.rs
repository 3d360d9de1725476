//! Reminder-specific error types.

use skycast_core::{
    AppError, ConfigError, NotificationError, ReqwestErrorExt, StorageError,
    WeatherError as CoreWeatherError,
};
use skycast_weather::WeatherError;
use thiserror::Error;

/// Errors from the key/value persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Invalid reminder time {input:?}: {reason}")]
    InvalidTime { input: String, reason: String },

    #[error("No usable weather data: {0}")]
    NoWeatherData(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),
}

impl ReminderError {
    pub fn invalid_time(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTime {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidTime { .. } => "A reminder time is not valid. Check your settings.",
            Self::NoWeatherData(_) => "Weather data is unavailable. Reminders were not updated.",
            Self::Store(_) => "Failed to access saved settings.",
            Self::Notification(e) => e.user_message(),
            Self::Weather(_) => "Weather service error. Reminders were not updated.",
        }
    }
}

impl From<ReminderError> for AppError {
    fn from(err: ReminderError) -> Self {
        match err {
            ReminderError::InvalidTime { .. } => {
                AppError::Config(ConfigError::Invalid(err.to_string()))
            }
            ReminderError::NoWeatherData(msg) => AppError::Weather(CoreWeatherError::ApiError(msg)),
            ReminderError::Store(StoreError::Serialization(e)) => {
                AppError::Storage(StorageError::Corruption(e.to_string()))
            }
            ReminderError::Store(e) => AppError::Storage(StorageError::WriteFailed(e.to_string())),
            ReminderError::Notification(e) => AppError::Notification(e),
            ReminderError::Weather(WeatherError::Network(e)) => {
                AppError::Network(e.into_network_error())
            }
            ReminderError::Weather(WeatherError::NotFound(what)) => {
                AppError::Weather(CoreWeatherError::LocationNotFound(what))
            }
            ReminderError::Weather(WeatherError::Cache(msg)) => {
                AppError::Weather(CoreWeatherError::CacheError(msg))
            }
            ReminderError::Weather(e) => AppError::Weather(CoreWeatherError::ApiError(e.to_string())),
        }
    }
}
