//! Notification channels and the dispatcher fanning events out to them.
//!
//! Channels are built once per contact method when the configuration is
//! loaded and shared read-only by every check afterwards.

use async_trait::async_trait;
use chrono::{DateTime, Local, Timelike};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{Config, ContactMethod};
use crate::error::ChannelError;
use crate::monitoring::site::Site;
use crate::monitoring::types::{CheckResult, Direction};

pub mod base;
pub mod dispatcher;
pub mod pushover;
pub mod zeromq;

pub use base::BaseChannel;
pub use dispatcher::{DispatchReport, Dispatcher, Subscriber};
pub use pushover::PushoverChannel;
pub use zeromq::{ZeroMqChannel, ZmqPublisher};

/// A confirmed state change to tell users about
#[derive(Debug, Clone, Copy)]
pub struct NotificationEvent<'a> {
    pub direction: Direction,
    pub site: &'a Site,
    pub result: &'a CheckResult,
}

impl NotificationEvent<'_> {
    pub fn title(&self) -> String {
        match self.direction {
            Direction::Down => format!("Service down: {}", self.site.name),
            Direction::Up => format!("Service up: {}", self.site.name),
        }
    }

    /// Human readable body, one `key: value` line per result field
    pub fn body(&self) -> String {
        self.result
            .summary_lines()
            .into_iter()
            .map(|(key, value)| format!("{key}: {value}\n"))
            .collect()
    }

    pub fn payload(&self) -> EventPayload<'_> {
        EventPayload {
            direction: self.direction,
            site: &self.site.name,
            url: &self.site.url,
            title: self.title(),
            result: self.result,
        }
    }
}

/// Wire form of an event for machine consumers
#[derive(Debug, Serialize)]
pub struct EventPayload<'a> {
    pub direction: Direction,
    pub site: &'a str,
    pub url: &'a str,
    pub title: String,
    pub result: &'a CheckResult,
}

/// Hours of the day during which a channel stays silent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuietHours(pub Vec<u32>);

impl QuietHours {
    pub fn allows(&self, now: DateTime<Local>) -> bool {
        !self.0.contains(&now.hour())
    }
}

/// A notification transport
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short name of the transport, used in history records
    fn kind(&self) -> &'static str;

    /// Pre-flight check, independent of site quiet hours
    fn is_allowed(&self, _now: DateTime<Local>) -> bool {
        true
    }

    async fn send(&self, event: &NotificationEvent<'_>) -> Result<(), ChannelError>;
}

/// Instantiate one channel per contact method of every user.
pub fn build_subscribers(config: &Config) -> Result<Vec<Subscriber>, ChannelError> {
    let client = pushover::default_client()?;
    let mut publisher: Option<Arc<ZmqPublisher>> = None;

    let mut subscribers = Vec::with_capacity(config.users.len());
    for user in &config.users {
        let mut channels: Vec<Arc<dyn Channel>> = Vec::with_capacity(user.contact_methods.len());
        for method in &user.contact_methods {
            let channel: Arc<dyn Channel> = match method {
                ContactMethod::Base => Arc::new(BaseChannel::new(&user.username)),
                ContactMethod::Pushover { account, device, quiet_hours } => {
                    let credentials = config
                        .pushover
                        .get(account)
                        .ok_or_else(|| ChannelError::UnknownAccount(account.clone()))?;
                    Arc::new(PushoverChannel::new(
                        client.clone(),
                        credentials.clone(),
                        device.clone(),
                        QuietHours(quiet_hours.clone()),
                    ))
                }
                ContactMethod::Zeromq { topic, quiet_hours } => {
                    let shared = match publisher.clone() {
                        Some(p) => p,
                        None => {
                            let p = Arc::new(ZmqPublisher::bind(&config.zeromq.endpoint())?);
                            publisher = Some(p.clone());
                            p
                        }
                    };
                    Arc::new(ZeroMqChannel::new(
                        shared,
                        topic.clone(),
                        QuietHours(quiet_hours.clone()),
                    ))
                }
            };
            channels.push(channel);
        }
        tracing::info!(user = %user.username, channels = channels.len(), "Registered contact methods");
        subscribers.push(Subscriber { username: user.username.clone(), channels });
    }

    Ok(subscribers)
}
