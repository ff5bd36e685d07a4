use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::models::{EntityOption, Notification, SearchFieldKind, WorkflowConfig, WorkflowError};
use crate::services::debounce::DebounceScheduler;
use crate::services::directory::{DoctorDirectory, PatientDirectory};
use crate::services::notifier::Notifier;
use crate::services::state::WorkflowStore;

#[derive(Clone)]
enum DirectorySource {
    Patient(Arc<dyn PatientDirectory>),
    Doctor(Arc<dyn DoctorDirectory>),
}

impl DirectorySource {
    async fn search(&self, term: &str) -> Result<Vec<EntityOption>, WorkflowError> {
        match self {
            DirectorySource::Patient(directory) => directory.search(term).await,
            DirectorySource::Doctor(directory) => directory.search(term).await,
        }
    }
}

struct LookupContext {
    kind: SearchFieldKind,
    store: WorkflowStore,
    source: DirectorySource,
    notifier: Arc<dyn Notifier>,
}

impl LookupContext {
    /// Runs one lookup tagged with the field generation it was scheduled for.
    async fn run(self: Arc<Self>, generation: u64, term: String) {
        let kind = self.kind;

        let dispatched = self.store.update(|state| {
            let field = state.field_mut(kind);
            if field.generation != generation || field.has_selection() {
                return false;
            }
            field.live_request = Some(generation);
            field.is_loading = true;
            true
        });

        if !dispatched {
            debug!("Skipping superseded {} lookup for {:?}", kind, term);
            return;
        }

        debug!("Searching {} directory for {:?}", kind, term);
        let result = self.source.search(&term).await;

        let outcome = self.store.update(|state| {
            let field = state.field_mut(kind);
            if field.live_request != Some(generation) {
                return Ok(false);
            }
            field.live_request = None;
            field.is_loading = false;

            match result {
                Ok(candidates) => {
                    debug!("{} lookup for {:?} returned {} candidates", kind, term, candidates.len());
                    field.candidate_list = candidates;
                    Ok(true)
                }
                Err(e) => {
                    field.candidate_list.clear();
                    Err(e)
                }
            }
        });

        match outcome {
            Ok(true) => {}
            Ok(false) => debug!("Discarding stale {} lookup result for {:?}", kind, term),
            Err(e) => {
                warn!("{} lookup for {:?} failed: {}", kind, term, e);
                self.notifier.notify(Notification::error(e.to_string()));
            }
        }
    }
}

/// Search-as-you-type state machine for one field.
pub struct TypeaheadController {
    context: Arc<LookupContext>,
    min_chars: usize,
    delay: Duration,
    scheduler: DebounceScheduler<SearchFieldKind>,
}

impl TypeaheadController {
    pub fn patient(
        directory: Arc<dyn PatientDirectory>,
        store: WorkflowStore,
        notifier: Arc<dyn Notifier>,
        config: &WorkflowConfig,
    ) -> Self {
        Self::new(
            SearchFieldKind::Patient,
            DirectorySource::Patient(directory),
            store,
            notifier,
            config,
        )
    }

    pub fn doctor(
        directory: Arc<dyn DoctorDirectory>,
        store: WorkflowStore,
        notifier: Arc<dyn Notifier>,
        config: &WorkflowConfig,
    ) -> Self {
        Self::new(
            SearchFieldKind::Doctor,
            DirectorySource::Doctor(directory),
            store,
            notifier,
            config,
        )
    }

    fn new(
        kind: SearchFieldKind,
        source: DirectorySource,
        store: WorkflowStore,
        notifier: Arc<dyn Notifier>,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            context: Arc::new(LookupContext {
                kind,
                store,
                source,
                notifier,
            }),
            min_chars: config.min_chars(kind),
            delay: config.debounce_delay,
            scheduler: DebounceScheduler::new(),
        }
    }

    pub fn kind(&self) -> SearchFieldKind {
        self.context.kind
    }

    /// An edit invalidates any prior selection, suggestions and in-flight lookup.
    pub fn on_input_changed(&self, text: &str) {
        let kind = self.kind();
        self.scheduler.cancel(&kind);

        self.context.store.update(|state| {
            let field = state.field_mut(kind);
            field.raw_input_text = text.to_string();
            field.clear_selection();
            field.candidate_list.clear();
            field.invalidate_lookup();
        });
    }

    pub fn on_input_settled(&self, text: &str) {
        let kind = self.kind();
        let term = text.trim().to_string();
        self.scheduler.cancel(&kind);

        if term.chars().count() < self.min_chars {
            self.context.store.update(|state| {
                let field = state.field_mut(kind);
                field.candidate_list.clear();
                field.clear_selection();
                field.invalidate_lookup();
            });
            return;
        }

        let generation = self
            .context
            .store
            .update(|state| state.field_mut(kind).invalidate_lookup());

        let context = Arc::clone(&self.context);
        self.scheduler.schedule(kind, self.delay, move || {
            tokio::spawn(context.run(generation, term));
        });
    }

    /// Returns `false` when `id` is not among the current candidates.
    pub fn on_candidate_selected(&self, id: &str) -> bool {
        let kind = self.kind();

        let selected = self.context.store.update(|state| {
            let field = state.field_mut(kind);
            let Some(option) = field.candidate_list.iter().find(|option| option.id == id).cloned()
            else {
                return false;
            };

            field.selected_entity_id = option.id;
            field.selected_entity_label = option.label;
            field.raw_input_text.clear();
            field.candidate_list.clear();
            field.invalidate_lookup();
            true
        });

        if selected {
            self.scheduler.cancel(&kind);
            debug!("Selected {} {}", kind, id);
        } else {
            debug!("Ignoring selection of {} {} not in candidate list", kind, id);
        }
        selected
    }

    pub fn cancel_pending(&self) {
        self.scheduler.cancel(&self.kind());
    }

    pub fn has_pending_lookup(&self) -> bool {
        self.scheduler.is_pending(&self.kind())
    }
}
