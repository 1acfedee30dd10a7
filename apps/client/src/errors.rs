#![allow(dead_code)]

use thiserror::Error;

/// Local input problems. Never reach the network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a PDF or DOCX file")]
    UnsupportedFileType,

    #[error("File size must be less than 10MB")]
    FileTooLarge,

    #[error("Please upload a resume file")]
    MissingFile,

    #[error("Please provide a job description")]
    MissingJobDescription,
}

/// The four failure classes the workflow reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Handled inline, fully recoverable.
    Validation,
    /// Global: clears the session and sends the user to login.
    Authorization,
    /// Surfaced, no session impact.
    NotFound,
    /// Dismissable message, prior state preserved.
    Transport,
}

/// Client-level error type.
/// Every fallible operation in the workflow returns `Result<T, ClientError>`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(
        "API error (status {status}){}",
        .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    Api {
        status: u16,
        message: Option<String>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("No analysis to display")]
    MissingAnalysis,

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Unauthorized => ErrorKind::Authorization,
            ClientError::NotFound(_) | ClientError::MissingAnalysis => ErrorKind::NotFound,
            ClientError::Api { .. }
            | ClientError::Http(_)
            | ClientError::Parse(_)
            | ClientError::Storage(_)
            | ClientError::InvalidUrl(_) => ErrorKind::Transport,
        }
    }

    pub fn is_authorization(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }

    /// The message shown to the user. A server-supplied message wins over `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(v) => v.to_string(),
            ClientError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ClientError::NotFound(msg) => msg.clone(),
            ClientError::Api {
                message: Some(msg), ..
            } if !msg.trim().is_empty() => msg.clone(),
            ClientError::MissingAnalysis => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}
