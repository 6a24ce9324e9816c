use async_trait::async_trait;

use super::{Channel, NotificationEvent};
use crate::error::ChannelError;

/// Channel that accepts every event and delivers nothing.
pub struct BaseChannel {
    username: String,
}

impl BaseChannel {
    pub fn new(username: &str) -> Self {
        Self { username: username.to_string() }
    }
}

#[async_trait]
impl Channel for BaseChannel {
    fn kind(&self) -> &'static str {
        "base"
    }

    async fn send(&self, event: &NotificationEvent<'_>) -> Result<(), ChannelError> {
        tracing::debug!(
            user = %self.username,
            site = %event.site.name,
            direction = %event.direction,
            "Base channel swallowed notification"
        );
        Ok(())
    }
}
