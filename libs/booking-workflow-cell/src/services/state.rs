use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::models::{BookingDraft, ReferenceOption, SearchField, SearchFieldKind, SubmissionPhase};

/// Everything a presentation layer binds to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookingFormState {
    pub patient: SearchField,
    pub doctor: SearchField,
    pub local_date_time: String,
    pub service_id: String,
    pub reason_value: String,
    pub time_validation_error: Option<String>,
    pub service_options: Vec<ReferenceOption>,
    pub reason_options: Vec<ReferenceOption>,
    pub is_service_loading: bool,
    pub is_reason_loading: bool,
    pub submission_phase: SubmissionPhase,
}

impl BookingFormState {
    pub fn field(&self, kind: SearchFieldKind) -> &SearchField {
        match kind {
            SearchFieldKind::Patient => &self.patient,
            SearchFieldKind::Doctor => &self.doctor,
        }
    }

    pub(crate) fn field_mut(&mut self, kind: SearchFieldKind) -> &mut SearchField {
        match kind {
            SearchFieldKind::Patient => &mut self.patient,
            SearchFieldKind::Doctor => &mut self.doctor,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submission_phase.is_in_flight()
    }

    pub fn draft(&self) -> BookingDraft {
        BookingDraft {
            patient_id: self.patient.selected_entity_id.clone(),
            doctor_id: self.doctor.selected_entity_id.clone(),
            local_date_time: self.local_date_time.clone(),
            service_id: self.service_id.clone(),
            reason_value: self.reason_value.clone(),
            time_validation_error: self.time_validation_error.clone(),
        }
    }

    /// Clear user entries. Reference lists, their loading flags and the phase of an
    /// outstanding submission are left alone.
    pub(crate) fn reset(&mut self) {
        self.patient.clear();
        self.doctor.clear();
        self.local_date_time.clear();
        self.service_id.clear();
        self.reason_value.clear();
        self.time_validation_error = None;
    }
}

/// Owner of the workflow state. Every mutation is one atomic step followed by a
/// change signal to all subscribers.
#[derive(Clone)]
pub struct WorkflowStore {
    sender: Arc<watch::Sender<BookingFormState>>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(BookingFormState::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn snapshot(&self) -> BookingFormState {
        self.sender.borrow().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut BookingFormState) -> R) -> R {
        let mut result = None;
        self.sender.send_modify(|state| result = Some(f(state)));
        match result {
            Some(value) => value,
            // send_modify always runs the closure
            None => unreachable!("state update closure was not invoked"),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BookingFormState> {
        debug!("New workflow state subscriber");
        self.sender.subscribe()
    }
}

impl Default for WorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}
