//! End-to-end reminder scheduling through `ReminderService`.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use skycast_core::ReminderConfig;
use skycast_reminders::{
    FileStore, FixedClock, InMemoryNotifier, KeyValueStore, MemoryStore, PresentationPolicy,
    ReminderError, ReminderService, Settings, SettingsStore, Trigger, WeatherSnapshot,
};
use skycast_weather::{
    Forecast, Geocoder, HourlyForecast, Location, TemperatureUnit, WeatherCache, WeatherError,
    WeatherProvider, WeatherSource,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn forecast(location: Location, temperature: f64, code: i32) -> Forecast {
    Forecast {
        location,
        timezone: "Asia/Ho_Chi_Minh".into(),
        utc_offset_seconds: Some(0),
        temperature_unit: TemperatureUnit::Celsius,
        hourly: (0..48)
            .map(|h| HourlyForecast {
                time: at(0, 0) + Duration::hours(h),
                temperature: Some(temperature),
                relative_humidity: Some(80.0),
                precipitation: Some(0.0),
                weather_code: Some(code),
                wind_speed: Some(5.0),
                wind_direction: Some(90.0),
                uv_index: Some(7.0),
                is_day: Some(true),
            })
            .collect(),
        daily: vec![],
        fetched_at: Utc::now(),
    }
}

/// Serves a canned forecast, or fails while `offline` is set.
struct FakeWeather {
    forecast: Mutex<Forecast>,
    offline: Mutex<bool>,
}

impl FakeWeather {
    fn new(forecast: Forecast) -> Self {
        Self {
            forecast: Mutex::new(forecast),
            offline: Mutex::new(false),
        }
    }

    fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }
}

#[async_trait]
impl WeatherSource for FakeWeather {
    async fn fetch_forecast(&self, _location: &Location) -> Result<Forecast, WeatherError> {
        if *self.offline.lock() {
            return Err(WeatherError::Status {
                status: 503,
                message: "offline".into(),
            });
        }
        Ok(self.forecast.lock().clone())
    }
}

struct Harness {
    notifier: Arc<InMemoryNotifier>,
    weather: Arc<FakeWeather>,
    service: ReminderService,
}

fn harness(kv: Arc<dyn KeyValueStore>, config: ReminderConfig) -> Harness {
    let notifier = Arc::new(InMemoryNotifier::new());
    let weather = Arc::new(FakeWeather::new(forecast(
        Location::named(16.46, 107.59, "Hue"),
        24.0,
        61,
    )));
    let service = ReminderService::new(
        SettingsStore::new(kv),
        weather.clone(),
        notifier.clone(),
        Arc::new(FixedClock::new(at(8, 0))),
        config,
    );
    Harness {
        notifier,
        weather,
        service,
    }
}

#[tokio::test]
async fn test_refresh_with_default_settings() {
    let h = harness(Arc::new(MemoryStore::new()), ReminderConfig::default());
    h.service.initialize().await.unwrap();

    let report = h
        .service
        .refresh(&Location::named(16.46, 107.59, "Hue"))
        .await
        .unwrap();

    assert_eq!(report.scheduled.len(), 2);
    let pending = h.notifier.pending_requests();
    assert_eq!(pending[0].content.title, "Weather update for Hue");
    assert_eq!(
        pending[0].content.body,
        "Light rain. Temperature: 24°C. UV index: 7. Bring an umbrella or raincoat. \
         UV is high, apply sunscreen."
    );
    assert_eq!(
        pending[0].trigger,
        Trigger::OneShot {
            delay_seconds: 22 * 3600
        }
    );
}

#[tokio::test]
async fn test_initialize_installs_policy_once() {
    let h = harness(Arc::new(MemoryStore::new()), ReminderConfig::default());
    assert!(!h.service.is_initialized());

    let first = h.service.initialize().await.unwrap();
    let second = h.service.initialize().await.unwrap();

    assert_eq!(first, PresentationPolicy::default());
    assert_eq!(first, second);
    assert!(h.service.is_initialized());
    assert_eq!(h.notifier.policy(), Some(PresentationPolicy::default()));
}

#[tokio::test]
async fn test_update_settings_persists_and_reschedules() {
    let dir = tempfile::tempdir().unwrap();
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()));
    let h = harness(kv.clone(), ReminderConfig::default());
    let hue = Location::named(16.46, 107.59, "Hue");

    h.service.refresh(&hue).await.unwrap();
    let settings = Settings {
        notification_times: vec!["07:00".into(), "7:00 AM".into(), "9:00 PM".into()],
        temp_unit: TemperatureUnit::Fahrenheit,
        uv_notifications: false,
        ..Settings::default()
    };
    let report = h.service.update_settings(&settings, &hue).await.unwrap();

    assert_eq!(report.cancelled.len(), 2);
    assert_eq!(report.scheduled.len(), 2);
    assert_eq!(h.notifier.pending().len(), 2);
    for request in h.notifier.pending_requests() {
        assert!(request.content.body.contains("75°F"));
        assert!(!request.content.body.contains("UV"));
    }

    // A fresh store over the same directory sees the saved settings
    let reloaded = SettingsStore::new(Arc::new(FileStore::new(dir.path()))).get_settings();
    assert_eq!(reloaded, settings);
}

#[tokio::test]
async fn test_fetch_failure_without_cache_leaves_reminders() {
    let h = harness(Arc::new(MemoryStore::new()), ReminderConfig::default());
    let hue = Location::named(16.46, 107.59, "Hue");
    h.service.refresh(&hue).await.unwrap();
    let before = h.notifier.pending();

    h.weather.set_offline(true);
    let err = h.service.refresh(&hue).await.unwrap_err();

    assert!(matches!(err, ReminderError::Weather(_)));
    assert_eq!(h.notifier.pending(), before);
}

#[tokio::test]
async fn test_fetch_failure_uses_fresh_cache() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(Arc::new(MemoryStore::new()), ReminderConfig::default());
    let service = h
        .service
        .with_cache(WeatherCache::new(dir.path()), Duration::hours(3));
    let hue = Location::named(16.46, 107.59, "Hue");

    service.refresh(&hue).await.unwrap();
    h.weather.set_offline(true);

    let report = service.refresh(&hue).await.unwrap();
    assert_eq!(report.kept.len(), 2);

    // Cache is per place
    let err = service
        .refresh(&Location::named(21.03, 105.85, "Ha Noi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReminderError::Weather(_)));
}

#[tokio::test]
async fn test_reschedule_with_snapshot() {
    let h = harness(Arc::new(MemoryStore::new()), ReminderConfig::default());
    let report = h
        .service
        .reschedule_with(WeatherSnapshot {
            location_name: "Da Nang".into(),
            temperature: 35.0,
            temperature_unit: TemperatureUnit::Celsius,
            weather_code: Some(0),
            uv_index: Some(8.0),
            latitude: 16.05,
            longitude: 108.2,
        })
        .await
        .unwrap();

    assert_eq!(report.active(), 2);
    let body = &h.notifier.pending_requests()[0].content.body;
    assert!(body.contains("Use sun protection"));
    assert!(body.contains("apply sunscreen"));
}

#[tokio::test]
async fn test_refresh_against_open_meteo_shape() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 16.46,
            "longitude": 107.59,
            "timezone": "Asia/Ho_Chi_Minh",
            "hourly": {
                "time": ["2026-03-01T08:00", "2026-03-01T09:00", "2026-03-01T10:00"],
                "temperature_2m": [12.4, 13.0, 14.2],
                "weather_code": [0, 0, 3],
                "uv_index": [1.0, 2.0, 3.0]
            },
            "daily": { "time": [] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "address": { "city": "Huế", "country": "Việt Nam" }
        })))
        .mount(&server)
        .await;

    let timeout = std::time::Duration::from_secs(5);
    let provider = WeatherProvider::with_options(
        &format!("{}/v1/forecast", server.uri()),
        TemperatureUnit::Celsius,
        1,
        "auto",
        timeout,
    )
    .unwrap();
    let geocoder = Geocoder::with_urls(
        &format!("{}/v1/search", server.uri()),
        &format!("{}/reverse", server.uri()),
        timeout,
    )
    .unwrap();

    let kv = Arc::new(MemoryStore::new());
    SettingsStore::new(kv.clone())
        .save_settings(&Settings {
            notification_times: vec!["09:00".into()],
            ..Settings::default()
        })
        .unwrap();

    let notifier = Arc::new(InMemoryNotifier::new());
    let service = ReminderService::new(
        SettingsStore::new(kv),
        Arc::new(provider),
        notifier.clone(),
        Arc::new(FixedClock::new(at(8, 0))),
        ReminderConfig::default(),
    )
    .with_geocoder(geocoder);

    service.refresh(&Location::new(16.46, 107.59)).await.unwrap();

    let request = notifier.pending_requests().remove(0);
    assert!(request.content.title.starts_with("Weather update for Huế"));
    assert_eq!(
        request.content.body,
        "Clear sky. Temperature: 13°C. UV index: 2. Wear warm clothing."
    );
    assert_eq!(request.trigger, Trigger::OneShot { delay_seconds: 3600 });
}
