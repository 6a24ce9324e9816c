use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CheckError;

/// Health of a site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    #[default]
    Up,
    Down,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Up => write!(f, "up"),
            SiteStatus::Down => write!(f, "down"),
        }
    }
}

/// Direction of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Raw data returned by a probe, before any classification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status_code: Option<u16>,
    pub body: Option<String>,
    pub connect_failed: bool,
    pub connect_timeout: bool,
    /// Time until response headers arrived
    pub connect_time: Duration,
    /// Time until the full body was read
    pub response_time: Duration,
}

impl ProbeOutcome {
    pub fn response(status_code: u16, body: impl Into<String>) -> Self {
        Self { status_code: Some(status_code), body: Some(body.into()), ..Default::default() }
    }

    pub fn connect_failed() -> Self {
        Self { connect_failed: true, ..Default::default() }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self {
            connect_failed: true,
            connect_timeout: true,
            connect_time: after,
            response_time: after,
            ..Default::default()
        }
    }
}

/// Result of one check against a site
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// When the probe was issued
    pub timestamp: DateTime<Local>,

    /// URL actually requested (placeholders resolved)
    pub url: String,

    pub status_code: Option<u16>,

    /// Response body. Never included in notifications.
    #[serde(skip)]
    pub body: Option<String>,

    /// `None` when the site has no content requirement
    pub content_matched: Option<bool>,

    pub connect_failed: bool,
    pub connect_timeout: bool,
    pub connect_time_ms: u64,
    pub response_time_ms: u64,

    /// Status this check classified the site as
    pub status: SiteStatus,

    /// Why the site was classified as down, if it was
    #[serde(skip)]
    pub failure: Option<CheckError>,

    pub notes: String,
}

impl CheckResult {
    pub fn new(url: String, timestamp: DateTime<Local>, outcome: ProbeOutcome) -> Self {
        Self {
            timestamp,
            url,
            status_code: outcome.status_code,
            body: outcome.body,
            content_matched: None,
            connect_failed: outcome.connect_failed,
            connect_timeout: outcome.connect_timeout,
            connect_time_ms: outcome.connect_time.as_millis() as u64,
            response_time_ms: outcome.response_time.as_millis() as u64,
            status: SiteStatus::Up,
            failure: None,
            notes: String::new(),
        }
    }

    pub fn is_down(&self) -> bool {
        self.status == SiteStatus::Down
    }

    /// `key: value` lines describing the check, without the body.
    pub fn summary_lines(&self) -> Vec<(&'static str, String)> {
        let opt = |v: Option<String>| v.unwrap_or_else(|| "null".to_string());
        vec![
            ("timestamp", self.timestamp.to_rfc3339()),
            ("url", self.url.clone()),
            ("status", self.status.to_string()),
            ("statusCode", opt(self.status_code.map(|c| c.to_string()))),
            ("contentMatched", opt(self.content_matched.map(|m| m.to_string()))),
            ("connectFailed", self.connect_failed.to_string()),
            ("connectTimeout", self.connect_timeout.to_string()),
            ("connectTime", format!("{}ms", self.connect_time_ms)),
            ("responseTime", format!("{}ms", self.response_time_ms)),
            ("notes", self.notes.clone()),
        ]
    }
}
