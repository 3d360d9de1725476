//! Platform notification boundary.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skycast_core::NotificationError;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::schedule::Trigger;

/// Platform-assigned handle for a scheduled notification.
pub type NotificationId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub content: NotificationContent,
    pub trigger: Trigger,
    /// Channel the notification is posted to, e.g. an Android channel id
    pub channel_id: String,
}

/// How delivered notifications are presented while the app is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationPolicy {
    pub show_alert: bool,
    pub play_sound: bool,
    pub set_badge: bool,
}

impl Default for PresentationPolicy {
    fn default() -> Self {
        Self {
            show_alert: true,
            play_sound: true,
            set_badge: false,
        }
    }
}

/// Scheduling capability provided by the host platform.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Install the app-wide presentation policy.
    async fn set_presentation_policy(
        &self,
        policy: PresentationPolicy,
    ) -> Result<(), NotificationError>;

    /// Cancel every pending notification, including ones this crate did not create.
    async fn cancel_all_scheduled(&self) -> Result<(), NotificationError>;

    /// Cancel one pending notification. Unknown ids are not an error.
    async fn cancel(&self, id: &str) -> Result<(), NotificationError>;

    async fn schedule(&self, request: NotificationRequest) -> Result<NotificationId, NotificationError>;
}

type FailurePredicate = Arc<dyn Fn(&NotificationRequest) -> bool + Send + Sync>;

#[derive(Default)]
struct NotifierState {
    next_id: u64,
    pending: BTreeMap<NotificationId, NotificationRequest>,
    policy: Option<PresentationPolicy>,
    fail_schedule: Option<FailurePredicate>,
    fail_cancel: bool,
    schedule_calls: usize,
    cancel_all_calls: usize,
}

/// A notification service that keeps pending notifications in memory.
///
/// Backs the command-line binary and the tests. Failures can be injected
/// with [`InMemoryNotifier::fail_when`] and [`InMemoryNotifier::fail_cancels`].
#[derive(Default)]
pub struct InMemoryNotifier {
    state: Mutex<NotifierState>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending notifications keyed by id.
    pub fn pending(&self) -> BTreeMap<NotificationId, NotificationRequest> {
        self.state.lock().pending.clone()
    }

    /// Pending requests without their ids, in id order.
    pub fn pending_requests(&self) -> Vec<NotificationRequest> {
        self.state.lock().pending.values().cloned().collect()
    }

    pub fn policy(&self) -> Option<PresentationPolicy> {
        self.state.lock().policy
    }

    /// Reject schedule calls whose request matches `predicate`.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&NotificationRequest) -> bool + Send + Sync + 'static,
    {
        self.state.lock().fail_schedule = Some(Arc::new(predicate));
    }

    /// Make every cancel call fail while `fail` is set.
    pub fn fail_cancels(&self, fail: bool) {
        self.state.lock().fail_cancel = fail;
    }

    pub fn schedule_calls(&self) -> usize {
        self.state.lock().schedule_calls
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.state.lock().cancel_all_calls
    }

    /// Add a notification as if another part of the host app had scheduled it.
    pub fn insert_foreign(&self, request: NotificationRequest) -> NotificationId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("foreign-{}", state.next_id);
        state.pending.insert(id.clone(), request);
        id
    }
}

#[async_trait]
impl NotificationService for InMemoryNotifier {
    async fn set_presentation_policy(
        &self,
        policy: PresentationPolicy,
    ) -> Result<(), NotificationError> {
        tracing::debug!("Presentation policy: {:?}", policy);
        self.state.lock().policy = Some(policy);
        Ok(())
    }

    async fn cancel_all_scheduled(&self) -> Result<(), NotificationError> {
        let mut state = self.state.lock();
        state.cancel_all_calls += 1;
        if state.fail_cancel {
            return Err(NotificationError::CancelFailed("cancel all rejected".into()));
        }
        let count = state.pending.len();
        state.pending.clear();
        tracing::debug!("Cancelled {} pending notifications", count);
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<(), NotificationError> {
        let mut state = self.state.lock();
        if state.fail_cancel {
            return Err(NotificationError::CancelFailed(id.to_string()));
        }
        state.pending.remove(id);
        Ok(())
    }

    async fn schedule(&self, request: NotificationRequest) -> Result<NotificationId, NotificationError> {
        let mut state = self.state.lock();
        state.schedule_calls += 1;

        if let Some(predicate) = &state.fail_schedule {
            if predicate(&request) {
                return Err(NotificationError::ScheduleFailed(request.content.title));
            }
        }

        state.next_id += 1;
        let id = format!("reminder-{:06}", state.next_id);
        tracing::info!(
            "Scheduled {} ({:?}): {}",
            id,
            request.trigger,
            request.content.title
        );
        state.pending.insert(id.clone(), request);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> NotificationRequest {
        NotificationRequest {
            content: NotificationContent {
                title: "Weather update for Hue".into(),
                body: body.into(),
            },
            trigger: Trigger::OneShot { delay_seconds: 60 },
            channel_id: "weather-updates".into(),
        }
    }

    #[tokio::test]
    async fn test_schedule_and_cancel() {
        let notifier = InMemoryNotifier::new();
        let a = notifier.schedule(request("a")).await.unwrap();
        let b = notifier.schedule(request("b")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(notifier.pending().len(), 2);

        notifier.cancel(&a).await.unwrap();
        notifier.cancel("missing").await.unwrap();
        assert_eq!(notifier.pending().keys().collect::<Vec<_>>(), vec![&b]);

        notifier.insert_foreign(request("other"));
        notifier.cancel_all_scheduled().await.unwrap();
        assert!(notifier.pending().is_empty());
        assert_eq!(notifier.cancel_all_calls(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let notifier = InMemoryNotifier::new();
        notifier.fail_when(|r| r.content.body == "bad");

        assert!(notifier.schedule(request("bad")).await.is_err());
        assert!(notifier.schedule(request("good")).await.is_ok());
        assert_eq!(notifier.schedule_calls(), 2);
        assert_eq!(notifier.pending().len(), 1);

        notifier.fail_cancels(true);
        assert!(matches!(
            notifier.cancel_all_scheduled().await,
            Err(NotificationError::CancelFailed(_))
        ));
        assert_eq!(notifier.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_policy_recorded() {
        let notifier = InMemoryNotifier::new();
        assert_eq!(notifier.policy(), None);
        notifier
            .set_presentation_policy(PresentationPolicy::default())
            .await
            .unwrap();
        assert_eq!(notifier.policy(), Some(PresentationPolicy::default()));
    }
}
