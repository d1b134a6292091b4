//! In-memory preference state with its load/save lifecycle.
//!
//! One [`PreferenceStore`] backs one settings form. It holds the document the
//! user is editing plus the reference data loaded with it, and reconciles
//! with the server on explicit `load()` / `save()` calls:
//!
//! ```text
//! Idle -> Loading -> Loaded | LoadError
//! Loaded -> Saving -> Loaded        (on success and on failure)
//! ```
//!
//! Loads replace document and reference data together; a failed load keeps
//! whatever was there. Saves send a snapshot of the whole document and never
//! touch local state, so a failed save can simply be retried. A second save
//! while one is in flight is refused. Results that arrive after `dispose()`,
//! or for a load that a newer load superseded, are dropped.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use super::document::{DeliveryMethod, DocumentDefaults, PreferenceDocument, ReportPreferences, UserPreferences};
use super::schedule::{ScheduleTime, TimezoneProvider};
use super::validation::ValidationError;
use crate::api::{ApiError, Category, Gateway, Report};
use crate::notify::{Notice, NotificationSink};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Result discarded: a newer load was started")]
    Superseded,

    #[error("Store has been disposed")]
    Disposed,
}

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    LoadError,
    Saving,
}

struct State<D: PreferenceDocument> {
    /// Load lifecycle; `Saving` is tracked separately in `saving`.
    lifecycle: Phase,
    saving: bool,
    document: D,
    reference: D::Reference,
    load_generation: u64,
}

pub struct PreferenceStore<D: PreferenceDocument> {
    gateway: Arc<dyn Gateway>,
    sink: Arc<dyn NotificationSink>,
    timezones: Arc<dyn TimezoneProvider>,
    defaults: DocumentDefaults,
    state: Mutex<State<D>>,
    disposed: AtomicBool,
}

/// Clears the saving flag even if the save future is dropped mid-request.
struct SavingGuard<'a, D: PreferenceDocument> {
    store: &'a PreferenceStore<D>,
}

impl<D: PreferenceDocument> Drop for SavingGuard<'_, D> {
    fn drop(&mut self) {
        self.store.lock().saving = false;
    }
}

impl<D: PreferenceDocument> PreferenceStore<D> {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        sink: Arc<dyn NotificationSink>,
        timezones: Arc<dyn TimezoneProvider>,
    ) -> Self {
        let defaults = DocumentDefaults::new(timezones.local());
        let document = D::with_defaults(&defaults);
        Self {
            gateway,
            sink,
            timezones,
            defaults,
            state: Mutex::new(State {
                lifecycle: Phase::Idle,
                saving: false,
                document,
                reference: D::Reference::default(),
                load_generation: 0,
            }),
            disposed: AtomicBool::new(false),
        }
    }

    // Never held across an await.
    fn lock(&self) -> MutexGuard<'_, State<D>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_live(&self) -> Result<(), StoreError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(StoreError::Disposed);
        }
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        let state = self.lock();
        if state.saving {
            Phase::Saving
        } else {
            state.lifecycle
        }
    }

    pub fn is_saving(&self) -> bool {
        self.lock().saving
    }

    /// Copy of the document as currently edited.
    pub fn snapshot(&self) -> D {
        self.lock().document.clone()
    }

    /// Copy of the reference data from the last successful load.
    pub fn reference(&self) -> D::Reference {
        self.lock().reference.clone()
    }

    /// Detach the store. Anything still in flight completes on the server but
    /// its result is ignored.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Fetch reference data and document concurrently and replace local state.
    ///
    /// If either request fails the whole load fails: previous state is kept,
    /// the phase becomes [`Phase::LoadError`] and an error notice is sent.
    pub async fn load(&self) -> Result<(), StoreError> {
        self.ensure_live()?;

        let (generation, previous) = {
            let mut state = self.lock();
            state.load_generation += 1;
            let previous = std::mem::replace(&mut state.lifecycle, Phase::Loading);
            (state.load_generation, previous)
        };

        let gateway = self.gateway.as_ref();
        let result = tokio::try_join!(
            D::fetch_reference(gateway),
            D::fetch(gateway, &self.defaults)
        );

        let mut state = self.lock();
        if self.is_disposed() {
            tracing::debug!(document = D::LABEL, "Dropping load result for disposed store");
            if state.load_generation == generation {
                state.lifecycle = previous;
            }
            return Err(StoreError::Disposed);
        }
        if state.load_generation != generation {
            tracing::debug!(
                document = D::LABEL,
                generation = generation,
                current = state.load_generation,
                "Dropping superseded load result"
            );
            return Err(StoreError::Superseded);
        }

        match result {
            Ok((reference, document)) => {
                state.reference = reference;
                state.document = document;
                state.lifecycle = Phase::Loaded;
                drop(state);
                tracing::info!(document = D::LABEL, "Loaded");
                Ok(())
            }
            Err(e) => {
                state.lifecycle = Phase::LoadError;
                drop(state);
                tracing::warn!(document = D::LABEL, error = %e, "Load failed");
                self.sink
                    .notify(Notice::error(format!("Failed to load {}", D::LABEL)));
                Err(e.into())
            }
        }
    }

    /// Submit the whole document, replacing the server copy.
    ///
    /// Local state is never modified: on success the server is assumed to
    /// hold exactly what was sent, on failure the edits stay for a retry.
    pub async fn save(&self) -> Result<(), StoreError> {
        self.ensure_live()?;

        let snapshot = {
            let mut state = self.lock();
            if state.saving {
                tracing::debug!(document = D::LABEL, "Save already in flight, ignoring");
                return Err(StoreError::SaveInProgress);
            }
            state.saving = true;
            state.document.clone()
        };
        let guard = SavingGuard { store: self };

        let result = snapshot.submit(self.gateway.as_ref()).await;
        drop(guard);

        if self.is_disposed() {
            tracing::debug!(document = D::LABEL, "Dropping save result for disposed store");
            return Err(StoreError::Disposed);
        }

        match result {
            Ok(()) => {
                tracing::info!(document = D::LABEL, "Saved");
                self.sink.notify(Notice::success(
                    "Saved",
                    format!("Your {} have been saved", D::LABEL),
                ));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(document = D::LABEL, error = %e, "Save failed");
                self.sink
                    .notify(Notice::error(format!("Failed to save {}", D::LABEL)));
                Err(e.into())
            }
        }
    }

    /// Apply an arbitrary local edit.
    pub fn edit<R>(&self, f: impl FnOnce(&mut D) -> R) -> Result<R, StoreError> {
        self.ensure_live()?;
        Ok(f(&mut self.lock().document))
    }

    /// Set the document timezone; must be known to the timezone provider.
    pub fn set_timezone(&self, tz: &str) -> Result<(), StoreError> {
        if !self.timezones.is_supported(tz) {
            return Err(ValidationError::UnknownTimezone(tz.to_owned()).into());
        }
        self.edit(|doc| *doc.timezone_mut() = tz.to_owned())
    }
}

impl PreferenceStore<UserPreferences> {
    pub fn add_keyword(&self, keyword: &str) -> Result<(), StoreError> {
        self.edit(|doc| doc.keywords.try_add(keyword))?
            .map_err(StoreError::from)
    }

    /// Returns whether the keyword was present.
    pub fn remove_keyword(&self, keyword: &str) -> Result<bool, StoreError> {
        self.edit(|doc| doc.keywords.remove(keyword))
    }

    /// Returns whether the category is selected afterwards.
    pub fn toggle_category(&self, id: i64) -> Result<bool, StoreError> {
        self.edit(|doc| doc.categories.toggle(id))
    }

    pub fn set_schedule_time(&self, raw: &str) -> Result<(), StoreError> {
        let time: ScheduleTime = raw.parse()?;
        self.edit(|doc| doc.schedule_time = time)
    }

    pub fn catalog(&self) -> Vec<Category> {
        self.reference()
    }

    /// Selected ids the loaded catalog does not list.
    pub fn stale_categories(&self) -> Vec<i64> {
        let state = self.lock();
        state.document.categories.stale(&state.reference)
    }
}

impl PreferenceStore<ReportPreferences> {
    pub fn set_delivery_time(&self, raw: &str) -> Result<(), StoreError> {
        let time: ScheduleTime = raw.parse()?;
        self.edit(|doc| doc.delivery_time = time)
    }

    pub fn set_email_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.edit(|doc| doc.email_enabled = enabled)
    }

    pub fn set_pdf_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.edit(|doc| doc.pdf_enabled = enabled)
    }

    /// Returns whether `method` is enabled afterwards.
    pub fn toggle_delivery_method(&self, method: DeliveryMethod) -> Result<bool, StoreError> {
        self.edit(|doc| {
            if doc.delivery_method.remove(&method) {
                false
            } else {
                doc.delivery_method.insert(method);
                true
            }
        })
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reference()
    }
}
