use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skycast_core::Config;
use skycast_reminders::{
    FavoritesStore, FileStore, InMemoryNotifier, KeyValueStore, NotificationService,
    ReminderService, SettingsStore, SystemClock,
};
use skycast_weather::{Geocoder, Location, WeatherCache, WeatherProvider};

/// Usage: `skycast [LATITUDE LONGITUDE]`
///
/// Without coordinates the first saved favorite is used, then the configured
/// default location.
#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;

    let (config, _validation) = Config::load_validated()?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let data_dir = &config.storage.data_dir;
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir));
    let settings = SettingsStore::new(kv.clone());
    let favorites = FavoritesStore::new(kv);

    let current = settings.get_settings();
    let timeout = Duration::from_secs(config.weather.request_timeout_secs);

    let provider = WeatherProvider::with_options(
        &config.weather.forecast_url,
        current.temp_unit,
        config.weather.forecast_days,
        &config.weather.timezone,
        timeout,
    )?;
    let geocoder = Geocoder::with_urls(
        &config.weather.geocoding_url,
        &config.weather.reverse_geocoding_url,
        timeout,
    )?;

    let notifier = Arc::new(InMemoryNotifier::new());
    let service = ReminderService::new(
        settings,
        Arc::new(provider),
        notifier.clone() as Arc<dyn NotificationService>,
        Arc::new(SystemClock),
        config.reminders.clone(),
    )
    .with_geocoder(geocoder)
    .with_cache(
        WeatherCache::new(data_dir),
        chrono::Duration::minutes(i64::from(config.weather.cache_max_age_minutes)),
    );

    service.initialize().await?;

    let location = location_from_args()?
        .or_else(|| favorites.list().first().map(|city| city.location()))
        .unwrap_or_else(|| {
            Location::new(config.weather.default_latitude, config.weather.default_longitude)
        });

    let report = service
        .refresh(&location)
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;

    println!("Skycast reminders for {}", location.display_name());
    for reminder in &report.scheduled {
        println!("  {}  next at {}", reminder.time, reminder.fire_at);
    }
    for time in &report.kept {
        println!("  {}  unchanged", time);
    }
    for skipped in &report.skipped {
        println!("  {:?} skipped: {}", skipped.input, skipped.reason);
    }

    for (id, request) in notifier.pending() {
        println!("\n[{}] {}\n{}", id, request.content.title, request.content.body);
    }

    Ok(())
}

fn location_from_args() -> Result<Option<Location>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(None),
        [lat, lon] => {
            let latitude: f64 = lat.parse().with_context(|| format!("invalid latitude {:?}", lat))?;
            let longitude: f64 = lon
                .parse()
                .with_context(|| format!("invalid longitude {:?}", lon))?;
            Ok(Some(Location::new(latitude, longitude)))
        }
        _ => anyhow::bail!("usage: skycast [LATITUDE LONGITUDE]"),
    }
}
