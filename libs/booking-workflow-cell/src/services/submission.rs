use std::sync::Arc;

use chrono::{Local, TimeZone};
use tracing::{debug, error, info, instrument, warn};

use crate::models::{
    AppointmentRequest, AvailabilityConflict, BookingDraft, DraftViolation, Notification,
    SubmissionOutcome, SubmissionPhase, WorkflowError,
};
use crate::services::directory::Scheduling;
use crate::services::notifier::Notifier;
use crate::services::state::WorkflowStore;
use crate::services::time_validation::TimeValidator;

pub const SLOT_UNAVAILABLE_MESSAGE: &str = "The selected time slot is no longer available.";
pub const BOOKING_CREATED_MESSAGE: &str = "Appointment created successfully.";

/// Runs the validate → check availability → create chain for one draft.
pub struct BookingSubmissionOrchestrator<Tz: TimeZone = Local> {
    scheduling: Arc<dyn Scheduling>,
    validator: TimeValidator<Tz>,
    store: WorkflowStore,
    notifier: Arc<dyn Notifier>,
}

impl<Tz> BookingSubmissionOrchestrator<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    pub fn new(
        scheduling: Arc<dyn Scheduling>,
        validator: TimeValidator<Tz>,
        store: WorkflowStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            scheduling,
            validator,
            store,
            notifier,
        }
    }

    /// Check every required entry. All violations are reported, not just the first.
    pub fn validate_draft(&self, draft: &BookingDraft) -> Result<String, Vec<DraftViolation>> {
        let mut violations = Vec::new();
        let mut canonical = None;

        if draft.patient_id.is_empty() {
            violations.push(DraftViolation::MissingPatient);
        }
        if draft.doctor_id.is_empty() {
            violations.push(DraftViolation::MissingDoctor);
        }
        if draft.local_date_time.trim().is_empty() {
            violations.push(DraftViolation::MissingDateTime);
        } else if let Some(message) = draft.time_validation_error.as_ref().filter(|m| !m.is_empty()) {
            violations.push(DraftViolation::TimeRejected(message.clone()));
        } else {
            match self.validator.to_canonical_utc_string(&draft.local_date_time) {
                Ok(value) => canonical = Some(value),
                Err(e) => violations.push(DraftViolation::TimeRejected(e.to_string())),
            }
        }
        if draft.service_id.is_empty() {
            violations.push(DraftViolation::MissingService);
        }
        if draft.reason_value.is_empty() {
            violations.push(DraftViolation::MissingReason);
        }

        match canonical {
            Some(value) if violations.is_empty() => Ok(value),
            _ => Err(violations),
        }
    }

    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<SubmissionOutcome, WorkflowError> {
        let admitted = self.store.update(|state| {
            if state.is_submitting() {
                return Err(WorkflowError::SubmissionInProgress);
            }

            let draft = state.draft();
            let checked = self.validate_draft(&draft).map(|canonical| {
                state.submission_phase = SubmissionPhase::Pending;
                (draft, canonical)
            });
            Ok(checked)
        })?;

        let (draft, utc_date_time) = match admitted {
            Ok(admitted) => admitted,
            Err(violations) => {
                warn!("Booking blocked by {} validation issue(s)", violations.len());
                for violation in &violations {
                    self.notifier.notify(Notification::error(violation.message()));
                }
                return Ok(SubmissionOutcome::Invalid(violations));
            }
        };

        let _in_flight = InFlightGuard { store: &self.store };

        info!(
            "Submitting booking for patient {} with doctor {} at {}",
            draft.patient_id, draft.doctor_id, utc_date_time
        );

        match self
            .scheduling
            .check_availability(&draft.doctor_id, &utc_date_time)
            .await
        {
            Ok(true) => self.advance(SubmissionPhase::AvailabilityChecked),
            Ok(false) => {
                self.advance(SubmissionPhase::Rejected);
                info!("Doctor {} is not available at {}", draft.doctor_id, utc_date_time);
                self.notifier.notify(Notification::error(SLOT_UNAVAILABLE_MESSAGE));
                return Ok(SubmissionOutcome::Rejected(AvailabilityConflict {
                    doctor_id: draft.doctor_id,
                    utc_date_time,
                }));
            }
            Err(e) => {
                self.advance(SubmissionPhase::Failed);
                let message = format!(
                    "An error occurred while checking appointment availability: {}",
                    e
                );
                self.notifier.notify(Notification::error(message.clone()));
                return Ok(SubmissionOutcome::Failed(message));
            }
        }

        let request = AppointmentRequest {
            patient_id: draft.patient_id,
            doctor_id: draft.doctor_id,
            utc_date_time,
            service_id: draft.service_id,
            reason_value: draft.reason_value,
        };

        match self.scheduling.create_appointment(&request).await {
            Ok(()) => {
                self.store.update(|state| {
                    self.apply_transition(&mut state.submission_phase, SubmissionPhase::Created);
                    state.reset();
                });
                info!("Appointment created for patient {}", request.patient_id);
                self.notifier.notify(Notification::success(BOOKING_CREATED_MESSAGE));
                Ok(SubmissionOutcome::Success)
            }
            Err(e) => {
                // Entries stay in place so the user can correct and resubmit
                self.advance(SubmissionPhase::Failed);
                let message = e.to_string();
                self.notifier.notify(Notification::error(message.clone()));
                Ok(SubmissionOutcome::Failed(message))
            }
        }
    }

    fn advance(&self, next: SubmissionPhase) {
        self.store
            .update(|state| self.apply_transition(&mut state.submission_phase, next));
    }

    fn apply_transition(&self, phase: &mut SubmissionPhase, next: SubmissionPhase) {
        match phase.transition(next) {
            Ok(new_phase) => {
                debug!("Submission phase {:?} -> {:?}", phase, new_phase);
                *phase = new_phase;
            }
            Err(e) => error!("{}", e),
        }
    }
}

/// Fails a chain whose future is dropped before it reaches a terminal phase.
struct InFlightGuard<'a> {
    store: &'a WorkflowStore,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.store.update(|state| {
            if !state.submission_phase.is_in_flight() {
                return;
            }
            warn!(
                "Submission dropped while {:?}; marking it failed",
                state.submission_phase
            );
            if let Ok(phase) = state.submission_phase.transition(SubmissionPhase::Failed) {
                state.submission_phase = phase;
            }
        });
    }
}
