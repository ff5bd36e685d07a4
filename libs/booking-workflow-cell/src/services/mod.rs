pub mod debounce;
pub mod directory;
pub mod notifier;
pub mod reference;
pub mod state;
pub mod submission;
pub mod supabase;
pub mod time_validation;
pub mod typeahead;
pub mod workflow;

pub use debounce::DebounceScheduler;
pub use directory::{DoctorDirectory, PatientDirectory, ReferenceData, Scheduling};
pub use notifier::{BroadcastNotifier, Notifier, TracingNotifier};
pub use reference::ReferenceDataLoader;
pub use state::{BookingFormState, WorkflowStore};
pub use submission::BookingSubmissionOrchestrator;
pub use supabase::SupabaseBookingBackend;
pub use time_validation::TimeValidator;
pub use typeahead::TypeaheadController;
pub use workflow::{BookingWorkflow, Collaborators};
