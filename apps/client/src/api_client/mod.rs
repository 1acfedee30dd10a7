/// Analysis service client. The single point of entry for every call to the
/// remote identity/analysis service.
///
/// No other module builds HTTP requests. Responses are normalized here, so
/// controllers only ever see canonical `AnalysisRecord`s.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analysis::normalize::{normalize_history, normalize_record};
use crate::errors::ClientError;
use crate::models::analysis::AnalysisRecord;
use crate::models::session::{AuthResponse, LoginRequest, SignupRequest};
use crate::models::upload::Submission;
use crate::session::store::SessionStore;

/// Operations the workflow needs from the remote service.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ClientError>;
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError>;
    async fn analyze(&self, submission: &Submission) -> Result<AnalysisRecord, ClientError>;
    async fn history(&self) -> Result<Vec<AnalysisRecord>, ClientError>;
    async fn analysis(&self, id: &str) -> Result<AnalysisRecord, ClientError>;
    async fn delete_analysis(&self, id: &str) -> Result<(), ClientError>;
}

/// Whether a request carries the session token and is subject to invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    /// Login/signup: a 401 means bad credentials, not an expired session.
    Anonymous,
    Bearer,
}

/// Error bodies seen from the service: `{message}`, `{error: "..."}`, `{error: {message}}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Detailed { message: String },
}

fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(match parsed.error {
            Some(ErrorDetail::Text(text)) => Some(text),
            Some(ErrorDetail::Detailed { message }) => Some(message),
            None => None,
        })
        .filter(|m| !m.trim().is_empty())
}

#[derive(Clone)]
pub struct HttpAnalysisService {
    client: Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl HttpAnalysisService {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionStore>,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            session,
        })
    }

    /// Appends path segments to the base URL. Each segment is percent-encoded,
    /// so an id can never introduce `/`, `?` or `#` into the request path.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn record_url(&self, id: &str) -> Result<Url, ClientError> {
        if matches!(id.trim(), "" | "." | "..") {
            return Err(ClientError::NotFound(format!("Analysis {id} not found")));
        }
        Ok(self.url(&["ats", "analysis", id]))
    }

    /// Sends a request and maps the status onto the error taxonomy.
    /// A 401 on an authenticated request clears the session before returning.
    async fn send(&self, request: RequestBuilder, auth: Auth) -> Result<Value, ClientError> {
        let request = match (auth, self.session.token()) {
            (Auth::Bearer, Some(token)) => request.bearer_auth(token),
            _ => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&body)?);
        }

        let message = error_message(&body);
        match status {
            StatusCode::UNAUTHORIZED if auth == Auth::Bearer => {
                warn!("Service rejected the session token");
                self.session.invalidate();
                Err(ClientError::Unauthorized)
            }
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(
                message.unwrap_or_else(|| "Analysis not found".to_string()),
            )),
            _ => {
                warn!("Service returned {}: {}", status, message.as_deref().unwrap_or(""));
                Err(ClientError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn send_auth(&self, action: &str, body: &impl serde::Serialize) -> Result<AuthResponse, ClientError> {
        let value = self
            .send(self.client.post(self.url(&["auth", action])).json(body), Auth::Anonymous)
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ClientError> {
        info!("Creating account for {}", request.email);
        self.send_auth("signup", request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        info!("Logging in as {}", request.email);
        self.send_auth("login", request).await
    }

    async fn analyze(&self, submission: &Submission) -> Result<AnalysisRecord, ClientError> {
        let file = &submission.file;
        let resume = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;

        let mut form = Form::new()
            .part("resume", resume)
            .text("jobDescription", submission.job_description.clone());
        if let Some(role) = &submission.target_role {
            form = form.text("targetRole", role.clone());
        }
        if let Some(level) = submission.experience_level {
            form = form.text("experienceLevel", level.as_str());
        }

        info!("Submitting {} ({} bytes) for analysis", file.name, file.size());
        let value = self
            .send(self.client.post(self.url(&["ats", "analyze"])).multipart(form), Auth::Bearer)
            .await?;
        normalize_record(&value).ok_or(ClientError::MissingAnalysis)
    }

    async fn history(&self) -> Result<Vec<AnalysisRecord>, ClientError> {
        let value = self
            .send(self.client.get(self.url(&["ats", "history"])), Auth::Bearer)
            .await?;
        let records = normalize_history(&value)?;
        debug!("Fetched {} history entries", records.len());
        Ok(records)
    }

    async fn analysis(&self, id: &str) -> Result<AnalysisRecord, ClientError> {
        let value = self
            .send(self.client.get(self.record_url(id)?), Auth::Bearer)
            .await?;
        normalize_record(&value).ok_or_else(|| ClientError::NotFound(format!("Analysis {id} not found")))
    }

    async fn delete_analysis(&self, id: &str) -> Result<(), ClientError> {
        self.send(
            self.client.delete(self.record_url(id)?),
            Auth::Bearer,
        )
        .await?;
        info!("Deleted analysis {id}");
        Ok(())
    }
}
