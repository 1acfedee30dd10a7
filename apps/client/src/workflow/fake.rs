//! In-memory `AnalysisService` for controller tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Semaphore;

use crate::analysis::normalize::normalize_record;
use crate::api_client::AnalysisService;
use crate::errors::ClientError;
use crate::models::analysis::AnalysisRecord;
use crate::models::session::{AuthResponse, LoginRequest, SignupRequest, User};
use crate::models::upload::Submission;
use crate::session::store::SessionStore;

#[derive(Debug, Clone)]
pub enum Failure {
    Unauthorized,
    NotFound,
    Server(Option<String>),
}

impl Failure {
    fn into_error(self) -> ClientError {
        match self {
            Failure::Unauthorized => ClientError::Unauthorized,
            Failure::NotFound => ClientError::NotFound("Analysis not found".into()),
            Failure::Server(message) => ClientError::Api {
                status: 500,
                message,
            },
        }
    }
}

pub struct FakeService {
    records: Mutex<Vec<AnalysisRecord>>,
    analyze_failure: Mutex<Option<Failure>>,
    history_failure: Mutex<Option<Failure>>,
    failing_ids: Mutex<HashMap<String, Failure>>,
    /// Every call takes one permit; a gated fake holds calls until released.
    gate: Semaphore,
    session: Mutex<Option<Arc<SessionStore>>>,
    pub analyze_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub last_submission: Mutex<Option<Submission>>,
    deleted: Mutex<HashSet<String>>,
}

pub fn record(id: &str, score: u8) -> AnalysisRecord {
    normalize_record(&json!({"id": id, "atsScore": score, "resumeFileName": format!("{id}.pdf")}))
        .unwrap()
}

impl FakeService {
    pub fn new(records: Vec<AnalysisRecord>) -> Self {
        Self::with_permits(records, Semaphore::MAX_PERMITS)
    }

    /// Calls block until `release` hands out permits.
    pub fn gated(records: Vec<AnalysisRecord>) -> Self {
        Self::with_permits(records, 0)
    }

    fn with_permits(records: Vec<AnalysisRecord>, permits: usize) -> Self {
        Self {
            records: Mutex::new(records),
            analyze_failure: Mutex::new(None),
            history_failure: Mutex::new(None),
            failing_ids: Mutex::new(HashMap::new()),
            gate: Semaphore::new(permits),
            session: Mutex::new(None),
            analyze_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            last_submission: Mutex::new(None),
            deleted: Mutex::new(HashSet::new()),
        }
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    /// Unauthorized failures clear this store, as the HTTP client does.
    pub fn with_session(self, session: Arc<SessionStore>) -> Self {
        *self.session.lock().unwrap() = Some(session);
        self
    }

    pub fn fail_analyze(&self, failure: Failure) {
        *self.analyze_failure.lock().unwrap() = Some(failure);
    }

    pub fn succeed_analyze(&self) {
        *self.analyze_failure.lock().unwrap() = None;
    }

    pub fn fail_history(&self, failure: Failure) {
        *self.history_failure.lock().unwrap() = Some(failure);
    }

    pub fn fail_id(&self, id: &str, failure: Failure) {
        self.failing_ids
            .lock()
            .unwrap()
            .insert(id.to_string(), failure);
    }

    pub fn was_deleted(&self, id: &str) -> bool {
        self.deleted.lock().unwrap().contains(id)
    }

    async fn pass_gate(&self) {
        self.gate.acquire().await.unwrap().forget();
    }

    fn fail(&self, failure: Failure) -> ClientError {
        if matches!(failure, Failure::Unauthorized) {
            if let Some(session) = self.session.lock().unwrap().as_ref() {
                session.invalidate();
            }
        }
        failure.into_error()
    }

    fn id_failure(&self, id: &str) -> Option<Failure> {
        self.failing_ids.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl AnalysisService for FakeService {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ClientError> {
        Ok(AuthResponse {
            user: User {
                id: "new-user".into(),
                name: request.name.clone(),
                email: request.email.clone(),
            },
            token: "signup-token".into(),
        })
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        if request.password != "hunter2" {
            return Err(ClientError::Api {
                status: 401,
                message: Some("Invalid credentials".into()),
            });
        }
        Ok(AuthResponse {
            user: User {
                id: "u1".into(),
                name: "Ada".into(),
                email: request.email.clone(),
            },
            token: "login-token".into(),
        })
    }

    async fn analyze(&self, submission: &Submission) -> Result<AnalysisRecord, ClientError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_submission.lock().unwrap() = Some(submission.clone());
        self.pass_gate().await;
        let failure = self.analyze_failure.lock().unwrap().clone();
        if let Some(failure) = failure {
            return Err(self.fail(failure));
        }
        let mut created = record("new", 88);
        created.resume_file_name = submission.file.name.clone();
        self.records.lock().unwrap().insert(0, created.clone());
        Ok(created)
    }

    async fn history(&self) -> Result<Vec<AnalysisRecord>, ClientError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        let failure = self.history_failure.lock().unwrap().clone();
        if let Some(failure) = failure {
            return Err(self.fail(failure));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn analysis(&self, id: &str) -> Result<AnalysisRecord, ClientError> {
        self.pass_gate().await;
        if let Some(failure) = self.id_failure(id) {
            return Err(self.fail(failure));
        }
        let found = self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.has_id(id))
            .cloned();
        found.ok_or_else(|| Failure::NotFound.into_error())
    }

    async fn delete_analysis(&self, id: &str) -> Result<(), ClientError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        if let Some(failure) = self.id_failure(id) {
            return Err(self.fail(failure));
        }
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !r.has_id(id));
        if records.len() == before {
            return Err(Failure::NotFound.into_error());
        }
        self.deleted.lock().unwrap().insert(id.to_string());
        Ok(())
    }
}
