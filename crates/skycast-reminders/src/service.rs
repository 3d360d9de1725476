//! Entry point used by the host app on focus, settings save and location change.

use chrono::Duration;
use parking_lot::Mutex;
use skycast_core::ReminderConfig;
use skycast_weather::{Forecast, Geocoder, Location, WeatherCache, WeatherSource};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::ReminderError;
use crate::notifier::{NotificationService, PresentationPolicy};
use crate::schedule::Clock;
use crate::scheduler::{NotificationScheduler, RescheduleReport};
use crate::settings::{Settings, SettingsStore};
use crate::snapshot::{WeatherContext, WeatherSnapshot};

/// Cached forecasts within this many degrees count as the same place.
const CACHE_LOCATION_TOLERANCE: f64 = 0.01;

pub struct ReminderService {
    settings: SettingsStore,
    weather: Arc<dyn WeatherSource>,
    geocoder: Option<Geocoder>,
    cache: Option<Mutex<WeatherCache>>,
    cache_max_age: Duration,
    scheduler: NotificationScheduler,
    notifier: Arc<dyn NotificationService>,
    clock: Arc<dyn Clock>,
    policy: OnceCell<PresentationPolicy>,
}

impl ReminderService {
    pub fn new(
        settings: SettingsStore,
        weather: Arc<dyn WeatherSource>,
        notifier: Arc<dyn NotificationService>,
        clock: Arc<dyn Clock>,
        config: ReminderConfig,
    ) -> Self {
        let scheduler = NotificationScheduler::new(notifier.clone(), clock.clone(), config);
        Self {
            settings,
            weather,
            geocoder: None,
            cache: None,
            cache_max_age: Duration::hours(3),
            scheduler,
            notifier,
            clock,
            policy: OnceCell::new(),
        }
    }

    /// Resolve place names for reminder titles.
    pub fn with_geocoder(mut self, geocoder: Geocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Fall back to a cached forecast younger than `max_age` when fetching fails.
    pub fn with_cache(mut self, cache: WeatherCache, max_age: Duration) -> Self {
        self.cache = Some(Mutex::new(cache));
        self.cache_max_age = max_age;
        self
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    /// Install the presentation policy. Only the first call reaches the platform.
    pub async fn initialize(&self) -> Result<PresentationPolicy, ReminderError> {
        let policy = self
            .policy
            .get_or_try_init(|| async {
                let policy = PresentationPolicy::default();
                self.notifier.set_presentation_policy(policy).await?;
                tracing::info!("Notification presentation policy installed: {:?}", policy);
                Ok::<_, ReminderError>(policy)
            })
            .await?;
        Ok(*policy)
    }

    pub fn is_initialized(&self) -> bool {
        self.policy.initialized()
    }

    /// Fetch weather for `location` and reschedule from the stored settings.
    pub async fn refresh(&self, location: &Location) -> Result<RescheduleReport, ReminderError> {
        self.warn_if_uninitialized();

        let settings = self.settings.get_settings();
        let forecast = self.load_forecast(location).await?;
        let name = self.location_name(location).await;
        let context = WeatherContext::from_forecast(&forecast, name, self.clock.now_zoned())?;

        self.scheduler.reschedule(&context, &settings).await
    }

    /// Persist new settings and reschedule with them.
    pub async fn update_settings(
        &self,
        settings: &Settings,
        location: &Location,
    ) -> Result<RescheduleReport, ReminderError> {
        self.settings.save_settings(settings)?;
        self.refresh(location).await
    }

    /// Reschedule from conditions the caller already has, without a forecast.
    pub async fn reschedule_with(
        &self,
        snapshot: WeatherSnapshot,
    ) -> Result<RescheduleReport, ReminderError> {
        self.warn_if_uninitialized();

        let settings = self.settings.get_settings();
        let context = WeatherContext::current_only(snapshot);
        self.scheduler.reschedule(&context, &settings).await
    }

    fn warn_if_uninitialized(&self) {
        if !self.is_initialized() {
            tracing::warn!("Scheduling reminders before initialize(); presentation policy not set");
        }
    }

    async fn load_forecast(&self, location: &Location) -> Result<Forecast, ReminderError> {
        match self.weather.fetch_forecast(location).await {
            Ok(forecast) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.lock().store(&forecast) {
                        tracing::warn!("Failed to cache forecast: {}", e);
                    }
                }
                Ok(forecast)
            }
            Err(e) => {
                tracing::warn!("Forecast fetch failed: {}", e);
                let cached = self
                    .cache
                    .as_ref()
                    .and_then(|cache| cache.lock().load_fresh(self.cache_max_age))
                    .filter(|f| same_place(&f.location, location));

                match cached {
                    Some(forecast) => {
                        tracing::info!("Using cached forecast from {}", forecast.fetched_at);
                        Ok(forecast)
                    }
                    None => Err(e.into()),
                }
            }
        }
    }

    async fn location_name(&self, location: &Location) -> String {
        if let Some(name) = &location.city_name {
            return name.clone();
        }
        match &self.geocoder {
            Some(geocoder) => geocoder
                .reverse(location)
                .await
                .unwrap_or_else(|| location.display_name()),
            None => location.display_name(),
        }
    }
}

fn same_place(a: &Location, b: &Location) -> bool {
    (a.latitude - b.latitude).abs() <= CACHE_LOCATION_TOLERANCE
        && (a.longitude - b.longitude).abs() <= CACHE_LOCATION_TOLERANCE
}
