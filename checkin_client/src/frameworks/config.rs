use std::{env, path::PathBuf, time::Duration};
use url::Url;

use crate::use_cases::RefreshSchedule;

// Runtime constants and environment lookups for the client.

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_STORAGE_PATH: &str = ".checkin/storage.json";

pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const SELF_SERVICE_COUNTDOWN: Duration = Duration::from_secs(30);
pub const SHARED_LINK_COUNTDOWN: Duration = Duration::from_secs(60);
pub const SHARED_LINK_STATUS_POLL: Duration = Duration::from_secs(10);
pub const SCANNER_STATS_POLL: Duration = Duration::from_secs(3);

pub fn self_service_schedule() -> RefreshSchedule {
    RefreshSchedule {
        countdown: SELF_SERVICE_COUNTDOWN,
        tick: COUNTDOWN_TICK,
        status_poll: None,
    }
}

pub fn shared_link_schedule() -> RefreshSchedule {
    RefreshSchedule {
        countdown: SHARED_LINK_COUNTDOWN,
        tick: COUNTDOWN_TICK,
        status_poll: Some(SHARED_LINK_STATUS_POLL),
    }
}

pub fn api_url() -> Result<Url, url::ParseError> {
    let raw = env::var("CHECKIN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    Url::parse(&raw)
}

// Unset keeps the HTTP client default (no request timeout).
pub fn http_timeout() -> Option<Duration> {
    env::var("CHECKIN_HTTP_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
}

pub fn storage_path() -> PathBuf {
    env::var("CHECKIN_STORAGE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH))
}

pub fn event_id() -> Option<String> {
    non_empty_var("CHECKIN_EVENT_ID")
}

pub fn username() -> Option<String> {
    non_empty_var("CHECKIN_USERNAME")
}

pub fn password() -> Option<String> {
    non_empty_var("CHECKIN_PASSWORD")
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Everything the scan station needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct StationConfig {
    pub api_url: Url,
    pub http_timeout: Option<Duration>,
    pub storage_path: PathBuf,
    pub event_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl StationConfig {
    pub fn from_env() -> Result<Self, url::ParseError> {
        Ok(Self {
            api_url: api_url()?,
            http_timeout: http_timeout(),
            storage_path: storage_path(),
            event_id: event_id(),
            username: username(),
            password: password(),
        })
    }
}
