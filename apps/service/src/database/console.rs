use async_trait::async_trait;
use tracing::{info, warn};

use super::HistorySink;
use crate::error::ChannelError;
use crate::monitoring::site::Site;
use crate::monitoring::types::CheckResult;

/// Writes history as structured log lines only.
pub struct ConsoleSink;

#[async_trait]
impl HistorySink for ConsoleSink {
    async fn log_failure(&self, site: &Site, result: &CheckResult) {
        warn!(
            target: "sitewatch::history",
            site = %site.name,
            url = %result.url,
            status_code = ?result.status_code,
            connect_ms = result.connect_time_ms,
            notes = %result.notes,
            "check failed"
        );
    }

    async fn log_success(&self, site: &Site, result: &CheckResult) {
        info!(
            target: "sitewatch::history",
            site = %site.name,
            status_code = ?result.status_code,
            response_ms = result.response_time_ms,
            "check succeeded"
        );
    }

    async fn log_false_alarm(&self, site: &Site) {
        info!(target: "sitewatch::history", site = %site.name, "false alarm suppressed");
    }

    async fn log_communication_success(&self, site: &Site, channel: &str) {
        info!(target: "sitewatch::history", site = %site.name, channel, "notification sent");
    }

    async fn log_communication_failure(&self, site: &Site, channel: &str, error: &ChannelError) {
        warn!(
            target: "sitewatch::history",
            site = %site.name,
            channel,
            error = %error,
            "notification failed"
        );
    }
}
