use std::sync::Arc;

use chrono::{Local, TimeZone};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::models::{SearchFieldKind, SubmissionOutcome, WorkflowConfig, WorkflowError};
use crate::services::directory::{DoctorDirectory, PatientDirectory, ReferenceData, Scheduling};
use crate::services::notifier::Notifier;
use crate::services::reference::ReferenceDataLoader;
use crate::services::state::{BookingFormState, WorkflowStore};
use crate::services::submission::BookingSubmissionOrchestrator;
use crate::services::time_validation::TimeValidator;
use crate::services::typeahead::TypeaheadController;

/// Remote services the workflow talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub patients: Arc<dyn PatientDirectory>,
    pub doctors: Arc<dyn DoctorDirectory>,
    pub reference: Arc<dyn ReferenceData>,
    pub scheduling: Arc<dyn Scheduling>,
}

impl Collaborators {
    /// Use one backend for every contract.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: PatientDirectory + DoctorDirectory + ReferenceData + Scheduling + 'static,
    {
        Self {
            patients: backend.clone(),
            doctors: backend.clone(),
            reference: backend.clone(),
            scheduling: backend,
        }
    }
}

/// The booking form controller: handlers in, observable state and notifications out.
pub struct BookingWorkflow<Tz: TimeZone = Local> {
    store: WorkflowStore,
    patient: TypeaheadController,
    doctor: TypeaheadController,
    reference_loader: ReferenceDataLoader,
    validator: TimeValidator<Tz>,
    orchestrator: BookingSubmissionOrchestrator<Tz>,
}

impl BookingWorkflow<Local> {
    pub fn new(
        collaborators: Collaborators,
        notifier: Arc<dyn Notifier>,
        config: &WorkflowConfig,
    ) -> Result<Self, WorkflowError> {
        Self::with_timezone(collaborators, notifier, config, Local)
    }
}

impl<Tz> BookingWorkflow<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    pub fn with_timezone(
        collaborators: Collaborators,
        notifier: Arc<dyn Notifier>,
        config: &WorkflowConfig,
        timezone: Tz,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;

        let store = WorkflowStore::new();
        let validator = TimeValidator::new(timezone, config);

        Ok(Self {
            patient: TypeaheadController::patient(
                collaborators.patients,
                store.clone(),
                notifier.clone(),
                config,
            ),
            doctor: TypeaheadController::doctor(
                collaborators.doctors,
                store.clone(),
                notifier.clone(),
                config,
            ),
            reference_loader: ReferenceDataLoader::new(
                collaborators.reference,
                store.clone(),
                notifier.clone(),
            ),
            orchestrator: BookingSubmissionOrchestrator::new(
                collaborators.scheduling,
                validator.clone(),
                store.clone(),
                notifier,
            ),
            validator,
            store,
        })
    }

    /// Load the reference picklists. Call once when the form opens.
    pub async fn start(&self) {
        info!("Starting booking workflow");
        self.reference_loader.load().await;
    }

    pub fn state(&self) -> BookingFormState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<BookingFormState> {
        self.store.subscribe()
    }

    pub fn search(&self, kind: SearchFieldKind) -> &TypeaheadController {
        match kind {
            SearchFieldKind::Patient => &self.patient,
            SearchFieldKind::Doctor => &self.doctor,
        }
    }

    pub fn on_patient_input_changed(&self, text: &str) {
        self.patient.on_input_changed(text);
    }

    pub fn on_patient_input_settled(&self, text: &str) {
        self.patient.on_input_settled(text);
    }

    pub fn on_patient_selected(&self, id: &str) -> bool {
        self.patient.on_candidate_selected(id)
    }

    pub fn on_doctor_input_changed(&self, text: &str) {
        self.doctor.on_input_changed(text);
    }

    pub fn on_doctor_input_settled(&self, text: &str) {
        self.doctor.on_input_settled(text);
    }

    pub fn on_doctor_selected(&self, id: &str) -> bool {
        self.doctor.on_candidate_selected(id)
    }

    /// Store the picker value and re-run the booking-hours check.
    pub fn set_date_time(&self, local_date_time: &str) {
        let error = self.validator.validate(local_date_time);
        if let Some(message) = &error {
            debug!("Appointment time {:?} rejected: {}", local_date_time, message);
        }

        self.store.update(|state| {
            state.local_date_time = local_date_time.to_string();
            state.time_validation_error = error;
        });
    }

    pub fn set_service(&self, service_id: &str) {
        self.store
            .update(|state| state.service_id = service_id.to_string());
    }

    pub fn set_reason(&self, reason_value: &str) {
        self.store
            .update(|state| state.reason_value = reason_value.to_string());
    }

    /// Earliest value the date-time picker should offer.
    pub fn minimum_allowed(&self) -> String {
        self.validator.minimum_allowed_input()
    }

    pub async fn submit(&self) -> Result<SubmissionOutcome, WorkflowError> {
        self.orchestrator.submit().await
    }

    /// Clear every user entry in one step. Pending and in-flight lookups are dropped.
    pub fn reset(&self) {
        self.patient.cancel_pending();
        self.doctor.cancel_pending();
        self.store.update(BookingFormState::reset);
        debug!("Booking form reset");
    }
}
