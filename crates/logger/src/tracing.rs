use std::env::var;
use std::str::FromStr;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Initialize tracing with a default level taken from configuration.
///
/// `RUST_LOG` still overrides the default directive, and `RUST_LOG_FORMAT=json`
/// forces json output when no format is configured.
pub fn init_with(level: &str, format: Option<LogFormat>) {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::INFO);
    initialize_tracing(level, format);
}

/// Initialize tracing subscriber with default configuration.
fn initialize_tracing(level: LevelFilter, format: Option<LogFormat>) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = format.unwrap_or_else(|| {
        var("RUST_LOG_FORMAT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    });

    let log_layer = match log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };

    if tracing_subscriber::registry().with(log_layer).try_init().is_err() {
        warn!("Tracing subscriber already initialized, keeping the existing one");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("pretty-please".parse::<LogFormat>().is_err());
    }
}
