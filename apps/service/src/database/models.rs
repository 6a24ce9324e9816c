use chrono::{DateTime, Local, TimeZone};

use crate::monitoring::types::SiteStatus;

/// A check result as stored in `check_results`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCheck {
    pub id: i64,
    pub site: String,
    pub timestamp: DateTime<Local>,
    pub status: SiteStatus,
    pub status_code: Option<u16>,
    pub content_matched: Option<bool>,
    pub connect_failed: bool,
    pub connect_timeout: bool,
    pub connect_time_ms: u64,
    pub response_time_ms: u64,
    pub notes: String,
}

/// A notification outcome as stored in `communications`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCommunication {
    pub id: i64,
    pub site: String,
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Local>,
}

/// Convert a timestamp to Unix milliseconds
pub fn timestamp_to_i64(time: DateTime<Local>) -> i64 {
    time.timestamp_millis()
}

/// Convert Unix milliseconds back to a local timestamp
pub fn i64_to_timestamp(millis: i64) -> DateTime<Local> {
    Local.timestamp_millis_opt(millis).single().unwrap_or_default()
}

pub fn status_from_str(raw: &str) -> SiteStatus {
    match raw {
        "down" => SiteStatus::Down,
        _ => SiteStatus::Up,
    }
}
