//! UploadController: collects a résumé + job description, validates locally and
//! submits exactly one analysis request at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info};

use crate::api_client::AnalysisService;
use crate::errors::{ClientError, ValidationError};
use crate::models::analysis::{AnalysisRecord, ExperienceLevel};
use crate::models::upload::{validate_resume, ResumeFile, Submission, UploadDraft};
use crate::session::guard::Route;
use crate::session::store::SessionStore;
use crate::workflow::{in_flight, lock, Completion};

pub const ANALYSIS_FAILED: &str = "Analysis failed. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Hand the record to the presenter and show results. The draft is gone.
    Analyzed(AnalysisRecord),
    /// No session: send the user to account creation instead.
    Redirect(Route),
    /// A submission is already in flight; nothing was sent.
    Busy,
}

#[derive(Default)]
struct UploadState {
    draft: UploadDraft,
    error: Option<String>,
    in_flight: bool,
    generation: u64,
}

pub struct UploadController {
    session: Arc<SessionStore>,
    service: Arc<dyn AnalysisService>,
    state: Mutex<UploadState>,
}

impl UploadController {
    pub fn new(session: Arc<SessionStore>, service: Arc<dyn AnalysisService>) -> Self {
        Self {
            session,
            service,
            state: Mutex::new(UploadState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, UploadState> {
        lock(&self.state)
    }

    /// Accepts PDF/DOCX up to 10 MiB. A rejected candidate never displaces the
    /// previously accepted file.
    pub fn set_file(&self, candidate: ResumeFile) -> Result<(), ValidationError> {
        let mut state = self.state();
        match validate_resume(&candidate) {
            Ok(()) => {
                debug!("Accepted {} ({} bytes)", candidate.name, candidate.size());
                state.error = None;
                state.draft.file = Some(candidate);
                Ok(())
            }
            Err(rejection) => {
                debug!("Rejected {}: {rejection}", candidate.name);
                state.error = Some(rejection.to_string());
                Err(rejection)
            }
        }
    }

    pub fn clear_file(&self) {
        self.state().draft.file = None;
    }

    pub fn set_job_description(&self, text: impl Into<String>) {
        self.state().draft.job_description = text.into();
    }

    /// Blank text counts as not provided.
    pub fn set_target_role(&self, role: Option<String>) {
        self.state().draft.target_role = role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
    }

    pub fn set_experience_level(&self, level: Option<ExperienceLevel>) {
        self.state().draft.experience_level = level;
    }

    /// Explicit user clear.
    pub fn clear(&self) {
        let mut state = self.state();
        state.draft = UploadDraft::default();
        state.error = None;
    }

    pub fn draft(&self) -> UploadDraft {
        self.state().draft.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.state().error = None;
    }

    pub fn is_submitting(&self) -> bool {
        self.state().in_flight
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        let state = self.state();
        state.draft.file.is_some() && !state.in_flight
    }

    /// The user navigated away. A submission still in flight will complete, but
    /// its result is dropped.
    pub fn leave(&self) {
        self.state().generation += 1;
    }

    pub async fn submit(&self) -> Result<Completion<SubmitOutcome>, ClientError> {
        let (submission, generation) = {
            let mut state = self.state();
            if state.in_flight {
                return Ok(Completion::Applied(SubmitOutcome::Busy));
            }
            let Some(file) = state.draft.file.clone() else {
                return Err(reject(&mut state, ValidationError::MissingFile));
            };
            if self.session.current().is_none() {
                info!("No session at submit time, redirecting to signup");
                return Ok(Completion::Applied(SubmitOutcome::Redirect(Route::Signup)));
            }
            if state.draft.job_description.trim().is_empty() {
                return Err(reject(&mut state, ValidationError::MissingJobDescription));
            }

            state.in_flight = true;
            state.error = None;
            let submission = Submission {
                file,
                job_description: state.draft.job_description.clone(),
                target_role: state.draft.target_role.clone(),
                experience_level: state.draft.experience_level,
            };
            (submission, state.generation)
        };

        let marker = in_flight(&self.state, |state| state.in_flight = false);
        let result = self.service.analyze(&submission).await;
        drop(marker);

        let mut state = self.state();
        if state.generation != generation {
            debug!("Discarding analysis result that arrived after navigation");
            return Ok(Completion::Discarded);
        }

        match result {
            Ok(record) => {
                info!("Analysis complete: score {}", record.ats_score);
                state.draft = UploadDraft::default();
                Ok(Completion::Applied(SubmitOutcome::Analyzed(record)))
            }
            Err(err) => {
                error!("Analysis error: {err}");
                state.error = Some(err.user_message(ANALYSIS_FAILED));
                Err(err)
            }
        }
    }
}

fn reject(state: &mut UploadState, rejection: ValidationError) -> ClientError {
    state.error = Some(rejection.to_string());
    ClientError::Validation(rejection)
}
