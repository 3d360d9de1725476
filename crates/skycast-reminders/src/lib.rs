//! Weather reminder scheduling for Skycast.
//!
//! Turns user settings plus a weather forecast into a set of platform
//! notifications: one per configured reminder time, each carrying the
//! expected conditions and advisory text for the moment it fires.

pub mod advisory;
pub mod error;
pub mod favorites;
pub mod notifier;
pub mod schedule;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod snapshot;
pub mod store;

pub use advisory::{compose_content, Advisory, AdvisoryRules};
pub use error::{ReminderError, StoreError};
pub use favorites::FavoritesStore;
pub use notifier::{
    InMemoryNotifier, NotificationContent, NotificationId, NotificationRequest,
    NotificationService, PresentationPolicy,
};
pub use schedule::{Clock, FixedClock, ReminderTime, SystemClock, Trigger};
pub use scheduler::{NotificationScheduler, RescheduleReport, ScheduledReminder, SkippedReminder};
pub use service::ReminderService;
pub use settings::{Settings, SettingsStore};
pub use snapshot::{WeatherContext, WeatherSnapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};
