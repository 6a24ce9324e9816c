use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex};

use super::{Channel, NotificationEvent, QuietHours};
use crate::error::ChannelError;

/// Milliseconds a publish may block before the message is dropped
const SEND_TIMEOUT_MS: i32 = 1000;

/// Shared ZeroMQ PUB socket. One per process, bound at startup.
pub struct ZmqPublisher {
    _context: zmq::Context,
    socket: Arc<Mutex<zmq::Socket>>,
    endpoint: String,
}

impl ZmqPublisher {
    pub fn bind(endpoint: &str) -> Result<Self, ChannelError> {
        let context = zmq::Context::new();
        let socket = context.socket(zmq::PUB)?;
        socket.set_sndtimeo(SEND_TIMEOUT_MS)?;
        socket.set_linger(0)?;
        socket.bind(endpoint)?;

        let endpoint = socket
            .get_last_endpoint()?
            .unwrap_or_else(|_| endpoint.to_string());
        tracing::info!(endpoint = %endpoint, "ZeroMQ publisher bound");

        Ok(Self { _context: context, socket: Arc::new(Mutex::new(socket)), endpoint })
    }

    /// Endpoint the socket actually bound to (wildcard ports resolved)
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Publish a `[topic, payload]` multipart message.
    pub async fn publish(&self, topic: String, payload: Vec<u8>) -> Result<(), ChannelError> {
        let socket = self.socket.clone();
        tokio::task::spawn_blocking(move || {
            let socket = socket.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            socket.send(topic.as_bytes(), zmq::SNDMORE)?;
            socket.send(payload, 0)?;
            Ok::<_, ChannelError>(())
        })
        .await?
    }
}

/// Publishes events on the message bus as JSON.
pub struct ZeroMqChannel {
    publisher: Arc<ZmqPublisher>,
    topic: String,
    quiet_hours: QuietHours,
}

impl ZeroMqChannel {
    pub fn new(publisher: Arc<ZmqPublisher>, topic: String, quiet_hours: QuietHours) -> Self {
        Self { publisher, topic, quiet_hours }
    }
}

#[async_trait]
impl Channel for ZeroMqChannel {
    fn kind(&self) -> &'static str {
        "zeromq"
    }

    fn is_allowed(&self, now: DateTime<Local>) -> bool {
        self.quiet_hours.allows(now)
    }

    async fn send(&self, event: &NotificationEvent<'_>) -> Result<(), ChannelError> {
        let payload = serde_json::to_vec(&event.payload())?;
        self.publisher.publish(self.topic.clone(), payload).await
    }
}
