use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::database;
use crate::monitoring::{CheckPipeline, HttpProbe, MonitoringScheduler, Site};
use crate::notify::{self, Dispatcher};

/// Wire sites, probe, history sink and channels from a validated config.
pub async fn build_scheduler(config: &Config) -> Result<MonitoringScheduler> {
    let sink = database::open_sink(&config.storage)
        .await
        .context("failed to open history storage")?;

    let subscribers = notify::build_subscribers(config).context("failed to set up channels")?;
    let dispatcher = Arc::new(Dispatcher::new(subscribers, sink.clone()));
    tracing::info!(channels = dispatcher.channel_count(), "Notification channels ready");

    let probe = Arc::new(HttpProbe::new(&config.monitor.user_agent)?);
    let pipeline = Arc::new(CheckPipeline::new(
        probe,
        sink,
        dispatcher,
        Duration::from_millis(config.monitor.confirmation_delay_ms),
    ));

    let sites = config.sites.iter().map(Site::from_config).collect();

    Ok(MonitoringScheduler::new(
        sites,
        pipeline,
        Duration::from_secs(config.monitor.tick_seconds),
    ))
}
