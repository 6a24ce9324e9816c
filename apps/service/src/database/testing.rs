use async_trait::async_trait;
use std::sync::Mutex;

use super::HistorySink;
use crate::error::ChannelError;
use crate::monitoring::site::Site;
use crate::monitoring::types::{CheckResult, SiteStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Failure { site: String, status_code: Option<u16>, notes: String },
    Success { site: String, status: SiteStatus },
    FalseAlarm { site: String },
    CommunicationSuccess { site: String, channel: String },
    CommunicationFailure { site: String, channel: String, error: String },
}

/// Sink that keeps every call in memory
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn failures(&self) -> usize {
        self.count(|e| matches!(e, SinkEvent::Failure { .. }))
    }

    pub fn false_alarms(&self) -> usize {
        self.count(|e| matches!(e, SinkEvent::FalseAlarm { .. }))
    }

    pub fn count(&self, pred: impl Fn(&SinkEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl HistorySink for RecordingSink {
    async fn log_failure(&self, site: &Site, result: &CheckResult) {
        self.push(SinkEvent::Failure {
            site: site.name.clone(),
            status_code: result.status_code,
            notes: result.notes.clone(),
        });
    }

    async fn log_success(&self, site: &Site, result: &CheckResult) {
        self.push(SinkEvent::Success { site: site.name.clone(), status: result.status });
    }

    async fn log_false_alarm(&self, site: &Site) {
        self.push(SinkEvent::FalseAlarm { site: site.name.clone() });
    }

    async fn log_communication_success(&self, site: &Site, channel: &str) {
        self.push(SinkEvent::CommunicationSuccess {
            site: site.name.clone(),
            channel: channel.to_string(),
        });
    }

    async fn log_communication_failure(&self, site: &Site, channel: &str, error: &ChannelError) {
        self.push(SinkEvent::CommunicationFailure {
            site: site.name.clone(),
            channel: channel.to_string(),
            error: error.to_string(),
        });
    }
}
