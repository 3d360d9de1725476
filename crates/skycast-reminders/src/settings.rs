//! User preferences that drive reminder scheduling.

use serde::{Deserialize, Serialize};
use skycast_core::ValidationResult;
use skycast_weather::{TemperatureUnit, WindUnit};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ReminderError;
use crate::schedule::ReminderTime;
use crate::store::KeyValueStore;

/// Storage key the settings record lives under.
pub const SETTINGS_KEY: &str = "settings";

/// User preferences, persisted as a single JSON record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Reminder times as entered, e.g. "06:00" or "4:00 PM"
    pub notification_times: Vec<String>,
    pub temp_unit: TemperatureUnit,
    pub wind_unit: WindUnit,
    pub uv_notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notification_times: vec!["06:00".to_string(), "16:00".to_string()],
            temp_unit: TemperatureUnit::Celsius,
            wind_unit: WindUnit::Kmh,
            uv_notifications: true,
        }
    }
}

impl Settings {
    /// Parsed reminder times in configured order, with unparsable entries dropped.
    pub fn reminder_times(&self) -> Vec<ReminderTime> {
        self.notification_times
            .iter()
            .filter_map(|t| ReminderTime::parse(t).ok())
            .collect()
    }

    /// Check the settings before saving them from an editing surface.
    ///
    /// The scheduler tolerates everything reported here; this is for
    /// surfacing problems to the user.
    pub fn validate(&self, max_times: Option<usize>) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.notification_times.is_empty() {
            result.add_error("notificationTimes", "At least one reminder time is required");
        }

        if let Some(max) = max_times {
            if self.notification_times.len() > max {
                result.add_error(
                    "notificationTimes",
                    format!("At most {} reminder times are allowed", max),
                );
            }
        }

        let mut seen = HashSet::new();
        for raw in &self.notification_times {
            match ReminderTime::parse(raw) {
                Ok(time) => {
                    if !seen.insert(time) {
                        result.add_warning(
                            "notificationTimes",
                            format!("{} is listed more than once", time),
                        );
                    }
                }
                Err(e) => result.add_error("notificationTimes", e.to_string()),
            }
        }

        result
    }
}

/// Reads and writes [`Settings`] through a key/value store.
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current settings, or the defaults if nothing usable is stored.
    ///
    /// Never fails. First use persists the defaults.
    pub fn get_settings(&self) -> Settings {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                let defaults = Settings::default();
                if let Err(e) = self.save_settings(&defaults) {
                    tracing::warn!("Failed to persist default settings: {}", e);
                }
                return defaults;
            }
            Err(e) => {
                tracing::warn!("Failed to read settings, using defaults: {}", e);
                return Settings::default();
            }
        };

        match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Stored settings are corrupted, using defaults: {}", e);
                Settings::default()
            }
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), ReminderError> {
        let json = serde_json::to_string(settings).map_err(crate::error::StoreError::from)?;
        self.store.set(SETTINGS_KEY, &json)?;
        tracing::debug!("Saved settings: {:?}", settings.notification_times);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn expected_defaults() -> Settings {
        Settings {
            notification_times: vec!["06:00".into(), "16:00".into()],
            temp_unit: TemperatureUnit::Celsius,
            wind_unit: WindUnit::Kmh,
            uv_notifications: true,
        }
    }

    #[test]
    fn test_defaults_on_empty_store_are_persisted() {
        let kv = Arc::new(MemoryStore::new());
        let store = SettingsStore::new(kv.clone());

        assert_eq!(store.get_settings(), expected_defaults());
        let raw = kv.get(SETTINGS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"notificationTimes\""));
        assert!(raw.contains("\"tempUnit\":\"C\""));
        assert!(raw.contains("\"windUnit\":\"kmh\""));
    }

    #[test]
    fn test_defaults_on_corrupted_record() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(SETTINGS_KEY, "{not json").unwrap();
        let store = SettingsStore::new(kv.clone());

        assert_eq!(store.get_settings(), expected_defaults());
        // corrupted data is left for inspection
        assert_eq!(kv.get(SETTINGS_KEY).unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn test_defaults_on_read_failure() {
        let store = SettingsStore::new(Arc::new(BrokenStore));
        assert_eq!(store.get_settings(), expected_defaults());
        assert!(store.save_settings(&expected_defaults()).is_err());
    }

    #[test]
    fn test_partial_record_fills_defaults() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(SETTINGS_KEY, r#"{"tempUnit":"F","uvNotifications":false}"#)
            .unwrap();
        let settings = SettingsStore::new(kv).get_settings();

        assert_eq!(settings.temp_unit, TemperatureUnit::Fahrenheit);
        assert!(!settings.uv_notifications);
        assert_eq!(settings.notification_times, vec!["06:00", "16:00"]);
    }

    #[test]
    fn test_save_then_get() {
        let store = SettingsStore::new(Arc::new(MemoryStore::new()));
        let settings = Settings {
            notification_times: vec!["07:15".into(), "9:00 PM".into()],
            temp_unit: TemperatureUnit::Fahrenheit,
            wind_unit: WindUnit::Mph,
            uv_notifications: false,
        };
        store.save_settings(&settings).unwrap();
        assert_eq!(store.get_settings(), settings);
    }

    #[test]
    fn test_reminder_times_skips_invalid() {
        let settings = Settings {
            notification_times: vec!["06:00".into(), "25:00".into(), "4:30 PM".into()],
            ..Settings::default()
        };
        let times: Vec<String> = settings
            .reminder_times()
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(times, vec!["06:00", "16:30"]);
    }

    #[test]
    fn test_validate() {
        assert!(Settings::default().validate(Some(4)).is_valid());

        let empty = Settings {
            notification_times: vec![],
            ..Settings::default()
        };
        assert!(!empty.validate(None).is_valid());

        let too_many = Settings {
            notification_times: vec!["01:00".into(), "02:00".into(), "03:00".into()],
            ..Settings::default()
        };
        assert!(too_many.validate(None).is_valid());
        assert!(!too_many.validate(Some(2)).is_valid());

        let bad = Settings {
            notification_times: vec!["06:00".into(), "6:00".into(), "nope".into()],
            ..Settings::default()
        };
        let result = bad.validate(None);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }
}
