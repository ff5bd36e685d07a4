use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use shared_models::AppError;

// ==============================================================================
// SEARCH FIELDS
// ==============================================================================

/// The two typeahead-backed fields of the booking form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFieldKind {
    Patient,
    Doctor,
}

impl SearchFieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchFieldKind::Patient => "patient",
            SearchFieldKind::Doctor => "doctor",
        }
    }
}

impl std::fmt::Display for SearchFieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOption {
    pub id: String,
    pub label: String,
}

impl EntityOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// State of one typeahead field.
///
/// A non-empty `selected_entity_id` implies an empty `candidate_list` and
/// `is_loading == false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchField {
    pub raw_input_text: String,
    pub selected_entity_id: String,
    pub selected_entity_label: String,
    pub candidate_list: Vec<EntityOption>,
    pub is_loading: bool,
    /// Bumped on every edit, settle, selection and reset.
    #[serde(skip)]
    pub(crate) generation: u64,
    /// Generation of the lookup whose result may still be applied.
    #[serde(skip)]
    pub(crate) live_request: Option<u64>,
}

impl SearchField {
    pub fn has_selection(&self) -> bool {
        !self.selected_entity_id.is_empty()
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selected_entity_id.clear();
        self.selected_entity_label.clear();
    }

    /// Drop any outstanding lookup so its result is discarded on arrival.
    pub(crate) fn invalidate_lookup(&mut self) -> u64 {
        self.generation += 1;
        self.live_request = None;
        self.is_loading = false;
        self.generation
    }

    pub(crate) fn clear(&mut self) {
        let generation = self.generation;
        *self = SearchField::default();
        self.generation = generation;
        self.invalidate_lookup();
    }
}

// ==============================================================================
// REFERENCE DATA
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceOption {
    pub value: String,
    pub label: String,
}

impl ReferenceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

// ==============================================================================
// DRAFT & SUBMISSION
// ==============================================================================

/// Full snapshot of the user's entries, taken at submit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub patient_id: String,
    pub doctor_id: String,
    pub local_date_time: String,
    pub service_id: String,
    pub reason_value: String,
    pub time_validation_error: Option<String>,
}

/// Payload of `Scheduling::create_appointment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub utc_date_time: String,
    pub service_id: String,
    pub reason_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityConflict {
    pub doctor_id: String,
    pub utc_date_time: String,
}

/// A structural problem that blocks submission before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftViolation {
    MissingPatient,
    MissingDoctor,
    MissingDateTime,
    TimeRejected(String),
    MissingService,
    MissingReason,
}

impl DraftViolation {
    pub fn message(&self) -> &str {
        match self {
            DraftViolation::MissingPatient => "Please select a patient from the list.",
            DraftViolation::MissingDoctor => "Please select a doctor from the list.",
            DraftViolation::MissingDateTime => "Please select an appointment date and time.",
            DraftViolation::TimeRejected(message) => message,
            DraftViolation::MissingService => "Please select a service.",
            DraftViolation::MissingReason => "Please select a reason for visit.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    Success,
    Rejected(AvailabilityConflict),
    Failed(String),
    Invalid(Vec<DraftViolation>),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success)
    }
}

/// Progress of the availability → create chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Pending,
    AvailabilityChecked,
    Created,
    Rejected,
    Failed,
}

impl SubmissionPhase {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SubmissionPhase::Pending | SubmissionPhase::AvailabilityChecked)
    }

    pub fn valid_transitions(&self) -> Vec<SubmissionPhase> {
        match self {
            SubmissionPhase::Idle => vec![SubmissionPhase::Pending],
            SubmissionPhase::Pending => vec![
                SubmissionPhase::AvailabilityChecked,
                SubmissionPhase::Rejected,
                SubmissionPhase::Failed,
            ],
            SubmissionPhase::AvailabilityChecked => vec![
                SubmissionPhase::Created,
                SubmissionPhase::Failed,
            ],
            // Terminal phases start a fresh chain on the next submit
            SubmissionPhase::Created
            | SubmissionPhase::Rejected
            | SubmissionPhase::Failed => vec![SubmissionPhase::Pending],
        }
    }

    pub fn transition(self, next: SubmissionPhase) -> Result<SubmissionPhase, WorkflowError> {
        if self.valid_transitions().contains(&next) {
            Ok(next)
        } else {
            Err(WorkflowError::InvalidTransition { from: self, to: next })
        }
    }
}

// ==============================================================================
// NOTIFICATIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message, Severity::Error)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new("Success", message, Severity::Success)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new("Info", message, Severity::Info)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// Remote failure; the payload is the human-readable message shown to the user.
    #[error("{0}")]
    Remote(String),

    #[error("A booking submission is already in progress")]
    SubmissionInProgress,

    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),

    #[error("Invalid submission transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SubmissionPhase,
        to: SubmissionPhase,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<anyhow::Error> for WorkflowError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast_ref::<AppError>() {
            Some(app_error) => WorkflowError::Remote(app_error.message().to_string()),
            None => WorkflowError::Remote(error.to_string()),
        }
    }
}

impl From<AppError> for WorkflowError {
    fn from(error: AppError) -> Self {
        WorkflowError::Remote(error.message().to_string())
    }
}

// ==============================================================================
// CONFIGURATION
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub debounce_delay: Duration,
    pub patient_min_chars: usize,
    pub doctor_min_chars: usize,
    /// First bookable UTC hour (inclusive).
    pub open_hour_utc: u32,
    /// Last bookable UTC hour (exclusive).
    pub close_hour_utc: u32,
    pub search_limit: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(300),
            patient_min_chars: 3,
            doctor_min_chars: 2,
            open_hour_utc: 9,
            close_hour_utc: 17,
            search_limit: 10,
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            debounce_delay: Duration::from_millis(env_or(
                "BOOKING_DEBOUNCE_MS",
                defaults.debounce_delay.as_millis() as u64,
            )),
            patient_min_chars: env_or("BOOKING_PATIENT_MIN_CHARS", defaults.patient_min_chars),
            doctor_min_chars: env_or("BOOKING_DOCTOR_MIN_CHARS", defaults.doctor_min_chars),
            open_hour_utc: env_or("BOOKING_OPEN_HOUR_UTC", defaults.open_hour_utc),
            close_hour_utc: env_or("BOOKING_CLOSE_HOUR_UTC", defaults.close_hour_utc),
            search_limit: env_or("BOOKING_SEARCH_LIMIT", defaults.search_limit),
        }
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.close_hour_utc > 24 || self.open_hour_utc >= self.close_hour_utc {
            return Err(WorkflowError::Configuration(format!(
                "Booking window [{}, {}) is not a valid range of UTC hours",
                self.open_hour_utc, self.close_hour_utc
            )));
        }
        if self.search_limit == 0 {
            return Err(WorkflowError::Configuration(
                "Search limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn min_chars(&self, kind: SearchFieldKind) -> usize {
        match kind {
            SearchFieldKind::Patient => self.patient_min_chars,
            SearchFieldKind::Doctor => self.doctor_min_chars,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_phase_transitions() {
        let phase = SubmissionPhase::Idle;
        let phase = phase.transition(SubmissionPhase::Pending).unwrap();
        let phase = phase.transition(SubmissionPhase::AvailabilityChecked).unwrap();
        assert!(phase.is_in_flight());

        let phase = phase.transition(SubmissionPhase::Created).unwrap();
        assert!(!phase.is_in_flight());
        assert!(phase.transition(SubmissionPhase::Pending).is_ok());
    }

    #[test]
    fn test_rejected_cannot_skip_to_created() {
        let err = SubmissionPhase::Pending
            .transition(SubmissionPhase::Created)
            .unwrap_err();

        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                from: SubmissionPhase::Pending,
                to: SubmissionPhase::Created,
            }
        );
    }

    #[test]
    fn test_default_config_matches_form_rules() {
        let config = WorkflowConfig::default();

        assert_eq!(config.debounce_delay, Duration::from_millis(300));
        assert_eq!(config.min_chars(SearchFieldKind::Patient), 3);
        assert_eq!(config.min_chars(SearchFieldKind::Doctor), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_inverted_window() {
        let config = WorkflowConfig {
            open_hour_utc: 17,
            close_hour_utc: 9,
            ..WorkflowConfig::default()
        };

        assert!(matches!(config.validate(), Err(WorkflowError::Configuration(_))));
    }

    #[test]
    fn test_clearing_field_invalidates_lookup() {
        let mut field = SearchField {
            raw_input_text: "Joh".to_string(),
            candidate_list: vec![EntityOption::new("p1", "John Smith")],
            is_loading: true,
            generation: 4,
            live_request: Some(4),
            ..SearchField::default()
        };

        field.clear();

        assert!(field.raw_input_text.is_empty());
        assert!(field.candidate_list.is_empty());
        assert!(!field.is_loading);
        assert_eq!(field.live_request, None);
        assert_eq!(field.generation, 5);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_value(Notification::success("done")).unwrap();
        assert_eq!(json["severity"], "success");
        assert_eq!(json["title"], "Success");
    }

    #[test]
    fn test_remote_error_keeps_bare_message() {
        let wrapped = anyhow::Error::new(AppError::Conflict("Slot taken".to_string()));
        assert_eq!(
            WorkflowError::from(wrapped),
            WorkflowError::Remote("Slot taken".to_string())
        );

        let plain = anyhow::anyhow!("connection reset");
        assert_eq!(WorkflowError::from(plain).to_string(), "connection reset");
    }
}
