#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::FixedOffset;

use booking_workflow_cell::*;

/// In-memory backend with per-term latency so tests can reorder responses.
#[derive(Default)]
pub struct FakeBackend {
    pub searches: Mutex<Vec<(SearchFieldKind, String)>>,
    pub search_delays: Mutex<HashMap<String, Duration>>,
    pub failing_terms: Mutex<Vec<String>>,
    pub available: Mutex<bool>,
    pub availability_delay: Mutex<Option<Duration>>,
    pub availability_calls: Mutex<Vec<(String, String)>>,
    pub created: Mutex<Vec<AppointmentRequest>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        *backend.available.lock().unwrap() = true;
        Arc::new(backend)
    }

    pub fn delay(&self, term: &str, delay: Duration) {
        self.search_delays
            .lock()
            .unwrap()
            .insert(term.to_string(), delay);
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock().unwrap() = available;
    }

    pub fn delay_availability(&self, delay: Option<Duration>) {
        *self.availability_delay.lock().unwrap() = delay;
    }

    pub fn search_terms(&self, kind: SearchFieldKind) -> Vec<String> {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, term)| term.clone())
            .collect()
    }

    pub fn remote_call_count(&self) -> usize {
        self.availability_calls.lock().unwrap().len() + self.created.lock().unwrap().len()
    }

    async fn lookup(&self, kind: SearchFieldKind, term: &str) -> Result<Vec<EntityOption>, WorkflowError> {
        self.searches
            .lock()
            .unwrap()
            .push((kind, term.to_string()));

        let delay = self.search_delays.lock().unwrap().get(term).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_terms.lock().unwrap().iter().any(|t| t == term) {
            return Err(WorkflowError::Remote(format!("{} directory unavailable", kind)));
        }

        Ok(vec![
            EntityOption::new(format!("{}-1", term), format!("{} One", term)),
            EntityOption::new(format!("{}-2", term), format!("{} Two", term)),
        ])
    }
}

#[async_trait]
impl PatientDirectory for FakeBackend {
    async fn search(&self, term: &str) -> Result<Vec<EntityOption>, WorkflowError> {
        self.lookup(SearchFieldKind::Patient, term).await
    }
}

#[async_trait]
impl DoctorDirectory for FakeBackend {
    async fn search(&self, term: &str) -> Result<Vec<EntityOption>, WorkflowError> {
        self.lookup(SearchFieldKind::Doctor, term).await
    }
}

#[async_trait]
impl ReferenceData for FakeBackend {
    async fn list_services(&self) -> Result<Vec<ReferenceOption>, WorkflowError> {
        Ok(vec![
            ReferenceOption::new("svc-1", "General Consultation"),
            ReferenceOption::new("svc-2", "Blood Test"),
        ])
    }

    async fn list_reasons(&self) -> Result<Vec<ReferenceOption>, WorkflowError> {
        Ok(vec![ReferenceOption::new("checkup", "Routine check-up")])
    }
}

#[async_trait]
impl Scheduling for FakeBackend {
    async fn check_availability(&self, doctor_id: &str, utc_date_time: &str) -> Result<bool, WorkflowError> {
        self.availability_calls
            .lock()
            .unwrap()
            .push((doctor_id.to_string(), utc_date_time.to_string()));

        let delay = *self.availability_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(*self.available.lock().unwrap())
    }

    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<(), WorkflowError> {
        self.created.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

pub fn build_workflow(
    backend: Arc<FakeBackend>,
) -> (BookingWorkflow<FixedOffset>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow = BookingWorkflow::with_timezone(
        Collaborators::from_backend(backend),
        notifier.clone(),
        &WorkflowConfig::default(),
        utc(),
    )
    .expect("default config is valid");
    (workflow, notifier)
}
