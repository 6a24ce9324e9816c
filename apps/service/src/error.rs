use thiserror::Error;

/// Why a probe classified a site as down.
///
/// The `Display` text doubles as the notes recorded on the check result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("Could not connect to server")]
    ConnectFailure,
    #[error("Could not connect to server (timed out after {seconds}s)")]
    ConnectTimeout { seconds: u64 },
    #[error("Unexpected status code {0} was returned")]
    UnexpectedStatus(u16),
    #[error("{}", missing_notes(.missing))]
    ContentMismatch { missing: Vec<String> },
}

fn missing_notes(missing: &[String]) -> String {
    missing
        .iter()
        .map(|needle| format!("{needle} not found in body."))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Failure of a single notification channel send.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("channel rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("no credentials configured for account '{0}'")]
    UnknownAccount(String),
    #[error("message bus error: {0}")]
    Bus(#[from] zmq::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("send task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
