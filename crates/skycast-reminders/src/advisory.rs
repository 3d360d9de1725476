//! Advisory rules and notification text.

use skycast_core::ReminderConfig;
use skycast_weather::WeatherCondition;

use crate::notifier::NotificationContent;
use crate::settings::Settings;
use crate::snapshot::WeatherSnapshot;

/// One actionable suggestion shown in a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Advisory {
    WarmClothing,
    SunProtection,
    Umbrella,
    Sunscreen,
    /// Shown alone when no other rule applies
    Unremarkable,
}

impl Advisory {
    pub fn text(&self) -> &'static str {
        match self {
            Self::WarmClothing => "Wear warm clothing.",
            Self::SunProtection => "Use sun protection: cover up and wear a hat.",
            Self::Umbrella => "Bring an umbrella or raincoat.",
            Self::Sunscreen => "UV is high, apply sunscreen.",
            Self::Unremarkable => "Weather is unremarkable, enjoy your day!",
        }
    }
}

/// Thresholds for the advisory rules. Temperatures are in Celsius.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryRules {
    pub cold_below_celsius: f64,
    pub hot_above_celsius: f64,
    pub uv_above: f64,
    /// Only suggest sun protection under a clear or partly cloudy sky
    pub hot_requires_clear_sky: bool,
}

impl Default for AdvisoryRules {
    fn default() -> Self {
        Self {
            cold_below_celsius: 15.0,
            hot_above_celsius: 30.0,
            uv_above: 5.0,
            hot_requires_clear_sky: true,
        }
    }
}

impl From<&ReminderConfig> for AdvisoryRules {
    fn from(config: &ReminderConfig) -> Self {
        Self {
            cold_below_celsius: config.cold_below_celsius,
            hot_above_celsius: config.hot_above_celsius,
            uv_above: config.uv_above,
            hot_requires_clear_sky: config.hot_requires_clear_sky,
        }
    }
}

impl AdvisoryRules {
    /// Every rule is checked independently; order of the result is fixed.
    pub fn suggestions(
        &self,
        temperature_celsius: f64,
        condition: WeatherCondition,
        uv_index: Option<f64>,
        uv_notifications: bool,
    ) -> Vec<Advisory> {
        let mut advice = Vec::new();

        if temperature_celsius < self.cold_below_celsius {
            advice.push(Advisory::WarmClothing);
        }

        if temperature_celsius > self.hot_above_celsius
            && (!self.hot_requires_clear_sky || condition.is_clear_or_partly_cloudy())
        {
            advice.push(Advisory::SunProtection);
        }

        if condition.is_wet() {
            advice.push(Advisory::Umbrella);
        }

        if uv_notifications && uv_index.is_some_and(|uv| uv > self.uv_above) {
            advice.push(Advisory::Sunscreen);
        }

        if advice.is_empty() {
            advice.push(Advisory::Unremarkable);
        }
        advice
    }
}

/// Build the title and body of a reminder.
///
/// The temperature is shown in the user's preferred unit regardless of the
/// unit the snapshot was fetched in.
pub fn compose_content(
    snapshot: &WeatherSnapshot,
    settings: &Settings,
    rules: &AdvisoryRules,
) -> NotificationContent {
    let condition = snapshot.condition();
    let celsius = snapshot.temperature_celsius();
    // Halves round up, so -2.5 shows as -2.
    let shown = (settings.temp_unit.convert_from_celsius(celsius) + 0.5).floor() as i64;

    let mut body = format!(
        "{}. Temperature: {}°{}.",
        condition.description(),
        shown,
        settings.temp_unit.symbol()
    );

    if settings.uv_notifications {
        if let Some(uv) = snapshot.uv_index {
            body.push_str(&format!(" UV index: {}.", (uv * 10.0).round() / 10.0));
        }
    }

    let advice = rules.suggestions(
        celsius,
        condition,
        snapshot.uv_index,
        settings.uv_notifications,
    );
    for item in advice {
        body.push(' ');
        body.push_str(item.text());
    }

    NotificationContent {
        title: format!("Weather update for {}", snapshot.location_name),
        body,
    }
}
