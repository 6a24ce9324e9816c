use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Channel, NotificationEvent, QuietHours};
use crate::config::PushoverAccount;
use crate::error::ChannelError;
use crate::monitoring::types::Direction;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub fn default_client() -> Result<Client, ChannelError> {
    Ok(Client::builder().timeout(SEND_TIMEOUT).build()?)
}

/// Push notifications through the Pushover messages API.
pub struct PushoverChannel {
    client: Client,
    account: PushoverAccount,
    device: Option<String>,
    quiet_hours: QuietHours,
}

#[derive(Serialize)]
struct PushoverMessage<'a> {
    token: &'a str,
    user: &'a str,
    title: String,
    message: String,
    priority: i8,
    sound: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a str>,
}

impl PushoverChannel {
    pub fn new(
        client: Client,
        account: PushoverAccount,
        device: Option<String>,
        quiet_hours: QuietHours,
    ) -> Self {
        Self { client, account, device, quiet_hours }
    }

    fn message<'a>(&'a self, event: &NotificationEvent<'_>) -> PushoverMessage<'a> {
        let (priority, sound) = match event.direction {
            Direction::Down => (1, "echo"),
            Direction::Up => (0, "pushover"),
        };
        PushoverMessage {
            token: &self.account.app_token,
            user: &self.account.user_token,
            title: event.title(),
            message: event.body(),
            priority,
            sound,
            device: self.device.as_deref(),
        }
    }
}

#[async_trait]
impl Channel for PushoverChannel {
    fn kind(&self) -> &'static str {
        "pushover"
    }

    fn is_allowed(&self, now: DateTime<Local>) -> bool {
        self.quiet_hours.allows(now)
    }

    async fn send(&self, event: &NotificationEvent<'_>) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(&self.account.api_url)
            .form(&self.message(event))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(ChannelError::Rejected { status: status.as_u16(), body });
        }

        tracing::debug!(site = %event.site.name, direction = %event.direction, "Pushover message accepted");
        Ok(())
    }
}
