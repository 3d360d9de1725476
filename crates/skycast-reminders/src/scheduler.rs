//! Reconciles configured reminder times with pending platform notifications.
//!
//! A pass plans one notification per distinct reminder time, then applies
//! the plan with the configured [`RescheduleStrategy`]:
//!
//! - `CancelAll` clears every pending notification and schedules the full set.
//! - `Diff` remembers the handle it got for each reminder time and only
//!   cancels, replaces or adds what changed. The first `Diff` pass also
//!   clears everything so handles left over from a previous process do not
//!   linger.
//!
//! Passes are serialized. A failing reminder time is skipped and reported;
//! it never aborts the rest of the pass.

use chrono::NaiveDateTime;
use skycast_core::{ReminderConfig, RescheduleStrategy};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::advisory::{compose_content, AdvisoryRules};
use crate::error::ReminderError;
use crate::notifier::{NotificationId, NotificationRequest, NotificationService};
use crate::schedule::{forecast_offset_hours, next_occurrence, Clock, ReminderTime, Trigger};
use crate::settings::Settings;
use crate::snapshot::WeatherContext;

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledReminder {
    pub time: ReminderTime,
    pub id: NotificationId,
    pub fire_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedReminder {
    /// The reminder time as configured
    pub input: String,
    pub reason: String,
}

/// Outcome of one reschedule pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RescheduleReport {
    /// Notifications created in this pass, replacements included
    pub scheduled: Vec<ScheduledReminder>,
    /// Times whose pending notification was already up to date
    pub kept: Vec<ReminderTime>,
    /// Times whose pending notification was cancelled and scheduled again
    pub replaced: Vec<ReminderTime>,
    /// Times no longer configured whose notification was cancelled
    pub cancelled: Vec<ReminderTime>,
    pub skipped: Vec<SkippedReminder>,
}

impl RescheduleReport {
    /// Reminders pending after the pass.
    pub fn active(&self) -> usize {
        self.scheduled.len() + self.kept.len()
    }

    fn skip(&mut self, input: impl Into<String>, reason: impl ToString) {
        let input = input.into();
        let reason = reason.to_string();
        tracing::warn!("Skipping reminder {:?}: {}", input, reason);
        self.skipped.push(SkippedReminder { input, reason });
    }
}

#[derive(Debug, Clone)]
struct PlannedReminder {
    time: ReminderTime,
    fire_at: NaiveDateTime,
    request: NotificationRequest,
}

#[derive(Debug, Clone)]
struct TrackedReminder {
    id: NotificationId,
    fire_at: NaiveDateTime,
    request: NotificationRequest,
}

impl TrackedReminder {
    fn matches(&self, plan: &PlannedReminder) -> bool {
        if self.request.content != plan.request.content
            || self.request.channel_id != plan.request.channel_id
        {
            return false;
        }
        match (&self.request.trigger, &plan.request.trigger) {
            // The delay shrinks as time passes; the target moment does not.
            (Trigger::OneShot { .. }, Trigger::OneShot { .. }) => self.fire_at == plan.fire_at,
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    tracked: BTreeMap<ReminderTime, TrackedReminder>,
    synced: bool,
}

pub struct NotificationScheduler {
    notifier: Arc<dyn NotificationService>,
    clock: Arc<dyn Clock>,
    config: ReminderConfig,
    rules: AdvisoryRules,
    state: Mutex<SchedulerState>,
}

impl NotificationScheduler {
    pub fn new(
        notifier: Arc<dyn NotificationService>,
        clock: Arc<dyn Clock>,
        config: ReminderConfig,
    ) -> Self {
        let rules = AdvisoryRules::from(&config);
        Self {
            notifier,
            clock,
            config,
            rules,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    /// Handles currently tracked per reminder time.
    pub async fn tracked(&self) -> Vec<(ReminderTime, NotificationId)> {
        self.state
            .lock()
            .await
            .tracked
            .iter()
            .map(|(time, t)| (*time, t.id.clone()))
            .collect()
    }

    /// Bring pending notifications in line with `settings` and `context`.
    ///
    /// Per-reminder problems end up in [`RescheduleReport::skipped`]. An error
    /// is returned only when clearing pending notifications fails, in which
    /// case nothing new is scheduled.
    pub async fn reschedule(
        &self,
        context: &WeatherContext,
        settings: &Settings,
    ) -> Result<RescheduleReport, ReminderError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let mut report = RescheduleReport::default();
        let plans = self.plan(context, settings, now, &mut report);

        match self.config.strategy {
            RescheduleStrategy::CancelAll => {
                self.replace_all(&mut state, plans, &mut report).await?
            }
            RescheduleStrategy::Diff => self.apply_diff(&mut state, plans, &mut report).await?,
        }

        tracing::info!(
            "Reschedule at {}: {} scheduled, {} kept, {} replaced, {} cancelled, {} skipped",
            now,
            report.scheduled.len(),
            report.kept.len(),
            report.replaced.len(),
            report.cancelled.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn plan(
        &self,
        context: &WeatherContext,
        settings: &Settings,
        now: NaiveDateTime,
        report: &mut RescheduleReport,
    ) -> Vec<PlannedReminder> {
        let mut seen = HashSet::new();
        let mut plans = Vec::new();

        for raw in &settings.notification_times {
            let time = match ReminderTime::parse(raw) {
                Ok(time) => time,
                Err(e) => {
                    report.skip(raw.as_str(), e);
                    continue;
                }
            };

            if !seen.insert(time) {
                tracing::debug!("Collapsing duplicate reminder time {}", time);
                continue;
            }

            if let Some(max) = self.config.max_times {
                if plans.len() >= max {
                    report.skip(
                        raw.as_str(),
                        format!("exceeds the limit of {} reminder times", max),
                    );
                    continue;
                }
            }

            let fire_at = next_occurrence(now, time);
            let snapshot = if self.config.forecast_adjust {
                context.snapshot_at(forecast_offset_hours(now, fire_at))
            } else {
                context.current.clone()
            };

            plans.push(PlannedReminder {
                time,
                fire_at,
                request: NotificationRequest {
                    content: compose_content(&snapshot, settings, &self.rules),
                    trigger: Trigger::for_mode(self.config.trigger_mode, now, time),
                    channel_id: self.config.channel_id.clone(),
                },
            });
        }

        plans
    }

    async fn replace_all(
        &self,
        state: &mut SchedulerState,
        plans: Vec<PlannedReminder>,
        report: &mut RescheduleReport,
    ) -> Result<(), ReminderError> {
        self.notifier.cancel_all_scheduled().await?;
        state.tracked.clear();
        state.synced = true;

        for plan in plans {
            self.schedule_new(state, plan, report).await;
        }
        Ok(())
    }

    async fn apply_diff(
        &self,
        state: &mut SchedulerState,
        plans: Vec<PlannedReminder>,
        report: &mut RescheduleReport,
    ) -> Result<(), ReminderError> {
        if !state.synced {
            self.notifier.cancel_all_scheduled().await?;
            state.tracked.clear();
            state.synced = true;
        }

        let desired: HashSet<ReminderTime> = plans.iter().map(|p| p.time).collect();
        let removed: Vec<ReminderTime> = state
            .tracked
            .keys()
            .filter(|time| !desired.contains(time))
            .copied()
            .collect();

        for time in removed {
            let Some(id) = state.tracked.get(&time).map(|t| t.id.clone()) else {
                continue;
            };
            match self.notifier.cancel(&id).await {
                Ok(()) => {
                    state.tracked.remove(&time);
                    report.cancelled.push(time);
                }
                // Still tracked, so the next pass retries the cancel
                Err(e) => tracing::warn!("Failed to cancel reminder {}: {}", time, e),
            }
        }

        for plan in plans {
            let time = plan.time;
            let existing = state
                .tracked
                .get(&time)
                .map(|t| (t.matches(&plan), t.id.clone()));

            let old_id = match existing {
                None => {
                    self.schedule_new(state, plan, report).await;
                    continue;
                }
                Some((true, _)) => {
                    report.kept.push(time);
                    continue;
                }
                Some((false, id)) => id,
            };

            if let Err(e) = self.notifier.cancel(&old_id).await {
                report.skip(time.to_string(), format!("could not replace: {}", e));
                continue;
            }
            state.tracked.remove(&time);

            if self.schedule_new(state, plan, report).await {
                report.replaced.push(time);
            }
        }

        Ok(())
    }

    /// Returns true if the platform accepted the notification.
    async fn schedule_new(
        &self,
        state: &mut SchedulerState,
        plan: PlannedReminder,
        report: &mut RescheduleReport,
    ) -> bool {
        match self.notifier.schedule(plan.request.clone()).await {
            Ok(id) => {
                tracing::debug!("Reminder {} scheduled as {} for {}", plan.time, id, plan.fire_at);
                report.scheduled.push(ScheduledReminder {
                    time: plan.time,
                    id: id.clone(),
                    fire_at: plan.fire_at,
                });
                state.tracked.insert(
                    plan.time,
                    TrackedReminder {
                        id,
                        fire_at: plan.fire_at,
                        request: plan.request,
                    },
                );
                true
            }
            Err(e) => {
                report.skip(plan.time.to_string(), e);
                false
            }
        }
    }
}
