use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "https://resume-refinery-backend.onrender.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;
const SESSION_DIR_NAME: &str = "resume-refinery";

/// Client configuration loaded from environment variables.
/// Every setting has a fallback, so a bare environment still yields a usable client.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub session_dir: PathBuf,
    pub download_dir: PathBuf,
    pub http_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let http_timeout_secs = match optional_env("REFINERY_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("REFINERY_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Config {
            api_url: optional_env("REFINERY_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            session_dir: match optional_env("REFINERY_SESSION_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => default_session_dir()?,
            },
            download_dir: optional_env("REFINERY_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            http_timeout: Duration::from_secs(http_timeout_secs),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Unset and empty are the same thing here.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_session_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(SESSION_DIR_NAME))
        .context("Could not determine a config directory; set REFINERY_SESSION_DIR")
}
