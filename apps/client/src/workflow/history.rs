use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info};

use crate::analysis::presenter::AnalysisView;
use crate::analysis::stats::{compute_stats, HistoryStats};
use crate::api_client::AnalysisService;
use crate::errors::ClientError;
use crate::models::analysis::AnalysisRecord;
use crate::workflow::{in_flight, lock, Completion};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this analysis?";
pub const HISTORY_FAILED: &str = "Failed to load history";
pub const VIEW_FAILED: &str = "Failed to load analysis";
pub const DELETE_FAILED: &str = "Failed to delete analysis";

/// Asks the user to confirm a destructive action.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(usize),
    /// Another fetch was already running; this call did nothing.
    AlreadyFetching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
    AlreadyPending,
}

#[derive(Default)]
struct HistoryState {
    records: Vec<AnalysisRecord>,
    loaded: bool,
    fetching: bool,
    pending_deletes: HashSet<String>,
    error: Option<String>,
    generation: u64,
}

/// Cached history list plus the per-id delete bookkeeping behind it.
pub struct HistoryController {
    service: Arc<dyn AnalysisService>,
    state: Mutex<HistoryState>,
}

impl HistoryController {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            state: Mutex::new(HistoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, HistoryState> {
        lock(&self.state)
    }

    /// Replaces the cache with the service's list. On failure the previous
    /// cache stays as it was.
    pub async fn fetch_history(&self) -> Result<Completion<FetchOutcome>, ClientError> {
        let generation = {
            let mut state = self.state();
            if state.fetching {
                debug!("History fetch already running");
                return Ok(Completion::Applied(FetchOutcome::AlreadyFetching));
            }
            state.fetching = true;
            state.generation
        };

        let marker = in_flight(&self.state, |state| state.fetching = false);
        let result = self.service.history().await;
        drop(marker);

        let mut state = self.state();
        if state.generation != generation {
            return Ok(Completion::Discarded);
        }
        match result {
            Ok(records) => {
                info!("Loaded {} analyses", records.len());
                let count = records.len();
                state.records = records;
                state.loaded = true;
                state.error = None;
                Ok(Completion::Applied(FetchOutcome::Loaded(count)))
            }
            Err(err) => {
                error!("Failed to fetch history: {err}");
                state.error = Some(err.user_message(HISTORY_FAILED));
                Err(err)
            }
        }
    }

    /// Fetches one record for the results screen. The cache is never touched.
    pub async fn view_record(&self, id: &str) -> Result<Completion<AnalysisView>, ClientError> {
        let generation = self.state().generation;

        let result = self.service.analysis(id).await;

        let mut state = self.state();
        if state.generation != generation {
            return Ok(Completion::Discarded);
        }
        match result {
            Ok(record) => Ok(Completion::Applied(AnalysisView::new(record))),
            Err(err) => {
                error!("Failed to load analysis {id}: {err}");
                state.error = Some(err.user_message(VIEW_FAILED));
                Err(err)
            }
        }
    }

    /// Deletes after confirmation. The record leaves the cache only once the
    /// service has confirmed; other rows are unaffected while this one is pending.
    pub async fn delete_record(
        &self,
        id: &str,
        confirm: &dyn Confirm,
    ) -> Result<Completion<DeleteOutcome>, ClientError> {
        if self.is_pending(id) {
            return Ok(Completion::Applied(DeleteOutcome::AlreadyPending));
        }
        if !confirm.confirm(DELETE_PROMPT) {
            debug!("Delete of {id} cancelled");
            return Ok(Completion::Applied(DeleteOutcome::Cancelled));
        }

        let generation = {
            let mut state = self.state();
            // Re-checked: another delete of this id may have started while prompting.
            if !state.pending_deletes.insert(id.to_string()) {
                return Ok(Completion::Applied(DeleteOutcome::AlreadyPending));
            }
            state.generation
        };

        let marker = in_flight(&self.state, |state| {
            state.pending_deletes.remove(id);
        });
        let result = self.service.delete_analysis(id).await;
        drop(marker);

        let mut state = self.state();
        let current = state.generation == generation;
        match result {
            // The record is gone upstream, so it leaves the cache even after `leave()`.
            Ok(()) => {
                state.records.retain(|r| !r.has_id(id));
                if current {
                    Ok(Completion::Applied(DeleteOutcome::Deleted))
                } else {
                    Ok(Completion::Discarded)
                }
            }
            Err(_) if !current => Ok(Completion::Discarded),
            Err(err) => {
                error!("Failed to delete analysis {id}: {err}");
                state.error = Some(err.user_message(DELETE_FAILED));
                Err(err)
            }
        }
    }

    pub fn records(&self) -> Vec<AnalysisRecord> {
        self.state().records.clone()
    }

    pub fn stats(&self) -> Option<HistoryStats> {
        compute_stats(&self.state().records)
    }

    pub fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    pub fn is_fetching(&self) -> bool {
        self.state().fetching
    }

    /// Whether the row for `id` is disabled by a delete in flight.
    pub fn is_pending(&self, id: &str) -> bool {
        self.state().pending_deletes.contains(id)
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.state().error = None;
    }

    pub fn leave(&self) {
        self.state().generation += 1;
    }
}
