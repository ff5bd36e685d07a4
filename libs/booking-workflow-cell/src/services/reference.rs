use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::{Notification, ReferenceOption, WorkflowError};
use crate::services::directory::ReferenceData;
use crate::services::notifier::Notifier;
use crate::services::state::{BookingFormState, WorkflowStore};

/// Loads the service and visit-reason picklists once per workflow start.
pub struct ReferenceDataLoader {
    reference: Arc<dyn ReferenceData>,
    store: WorkflowStore,
    notifier: Arc<dyn Notifier>,
}

impl ReferenceDataLoader {
    pub fn new(
        reference: Arc<dyn ReferenceData>,
        store: WorkflowStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            reference,
            store,
            notifier,
        }
    }

    /// Fetch both lists concurrently. A failure in one leaves that list empty and
    /// does not affect the other.
    pub async fn load(&self) {
        self.store.update(|state| {
            state.is_service_loading = true;
            state.is_reason_loading = true;
        });

        tokio::join!(self.load_services(), self.load_reasons());
    }

    async fn load_services(&self) {
        let result = self.reference.list_services().await;
        self.apply("service", result, |state, options, loading| {
            state.service_options = options;
            state.is_service_loading = loading;
        });
    }

    async fn load_reasons(&self) {
        let result = self.reference.list_reasons().await;
        self.apply("reason", result, |state, options, loading| {
            state.reason_options = options;
            state.is_reason_loading = loading;
        });
    }

    fn apply<F>(&self, list: &str, result: Result<Vec<ReferenceOption>, WorkflowError>, set: F)
    where
        F: FnOnce(&mut BookingFormState, Vec<ReferenceOption>, bool),
    {
        match result {
            Ok(options) => {
                debug!("Loaded {} {} options", options.len(), list);
                self.store.update(|state| set(state, options, false));
            }
            Err(e) => {
                warn!("Failed to load {} options: {}", list, e);
                self.store.update(|state| set(state, Vec::new(), false));
                self.notifier.notify(Notification::error(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::services::directory::MockReferenceData;

    #[derive(Default)]
    struct RecordingNotifier {
        notifications: Mutex<Vec<Notification>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }

    #[tokio::test]
    async fn test_both_lists_load_in_source_order() {
        let mut reference = MockReferenceData::new();
        reference.expect_list_services().times(1).returning(|| {
            Ok(vec![
                ReferenceOption::new("svc-2", "X-Ray"),
                ReferenceOption::new("svc-1", "Consultation"),
            ])
        });
        reference
            .expect_list_reasons()
            .times(1)
            .returning(|| Ok(vec![ReferenceOption::new("checkup", "Annual check-up")]));

        let store = WorkflowStore::new();
        let loader = ReferenceDataLoader::new(
            Arc::new(reference),
            store.clone(),
            Arc::new(RecordingNotifier::default()),
        );
        loader.load().await;

        let state = store.snapshot();
        assert_eq!(state.service_options[0].value, "svc-2");
        assert_eq!(state.service_options[1].label, "Consultation");
        assert_eq!(state.reason_options.len(), 1);
        assert!(!state.is_service_loading);
        assert!(!state.is_reason_loading);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_the_other() {
        let mut reference = MockReferenceData::new();
        reference
            .expect_list_services()
            .returning(|| Err(WorkflowError::Remote("Services unavailable".to_string())));
        reference
            .expect_list_reasons()
            .returning(|| Ok(vec![ReferenceOption::new("followup", "Follow-up")]));

        let store = WorkflowStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let loader = ReferenceDataLoader::new(Arc::new(reference), store.clone(), notifier.clone());
        loader.load().await;

        let state = store.snapshot();
        assert!(state.service_options.is_empty());
        assert!(!state.is_service_loading);
        assert_eq!(state.reason_options[0].value, "followup");

        let notifications = notifier.notifications.lock().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "Services unavailable");
    }
}
