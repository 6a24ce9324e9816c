use chrono::{DateTime, Local};
use futures::future::join_all;
use std::sync::Arc;

use super::{Channel, NotificationEvent};
use crate::database::HistorySink;

/// A user and the channels built from their contact methods
pub struct Subscriber {
    pub username: String,
    pub channels: Vec<Arc<dyn Channel>>,
}

/// Tally of one fan-out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    /// Channels that declined the event in `is_allowed`
    pub skipped: usize,
}

/// Fans confirmed events out to every subscriber's channels.
pub struct Dispatcher {
    subscribers: Vec<Subscriber>,
    sink: Arc<dyn HistorySink>,
}

impl Dispatcher {
    pub fn new(subscribers: Vec<Subscriber>, sink: Arc<dyn HistorySink>) -> Self {
        Self { subscribers, sink }
    }

    pub fn channel_count(&self) -> usize {
        self.subscribers.iter().map(|s| s.channels.len()).sum()
    }

    /// Send `event` on every allowed channel. Sends run concurrently and a
    /// failed send never stops the others; each outcome goes to the sink.
    pub async fn dispatch(&self, event: &NotificationEvent<'_>, now: DateTime<Local>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut sends = Vec::new();

        for subscriber in &self.subscribers {
            for channel in &subscriber.channels {
                if !channel.is_allowed(now) {
                    tracing::debug!(
                        user = %subscriber.username,
                        channel = channel.kind(),
                        "Channel not allowed right now, skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
                sends.push(self.send_one(&subscriber.username, channel.as_ref(), event));
            }
        }

        for delivered in join_all(sends).await {
            if delivered {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            site = %event.site.name,
            direction = %event.direction,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Notification dispatched"
        );
        report
    }

    async fn send_one(&self, username: &str, channel: &dyn Channel, event: &NotificationEvent<'_>) -> bool {
        let label = format!("{}:{}", channel.kind(), username);
        match channel.send(event).await {
            Ok(()) => {
                self.sink.log_communication_success(event.site, &label).await;
                true
            }
            Err(e) => {
                tracing::warn!(site = %event.site.name, channel = %label, error = %e, "Notification send failed");
                self.sink.log_communication_failure(event.site, &label, &e).await;
                false
            }
        }
    }
}
