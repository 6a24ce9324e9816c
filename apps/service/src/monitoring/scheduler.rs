use chrono::{DateTime, Local};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::interval;
use tracing::Instrument;

use super::executor::{CheckOutcome, CheckPipeline};
use super::site::Site;

/// A site shared between the scheduler and its in-flight check
#[derive(Clone)]
struct SiteHandle {
    name: String,
    site: Arc<Mutex<Site>>,
}

/// Monitoring scheduler - starts due checks on every tick
pub struct MonitoringScheduler {
    sites: Vec<SiteHandle>,
    pipeline: Arc<CheckPipeline>,
    tick: Duration,
}

impl MonitoringScheduler {
    pub fn new(sites: Vec<Site>, pipeline: Arc<CheckPipeline>, tick: Duration) -> Self {
        let sites = sites
            .into_iter()
            .map(|site| SiteHandle { name: site.name.clone(), site: Arc::new(Mutex::new(site)) })
            .collect();
        Self { sites, pipeline, tick }
    }

    pub fn site(&self, name: &str) -> Option<Arc<Mutex<Site>>> {
        self.sites.iter().find(|h| h.name == name).map(|h| h.site.clone())
    }

    /// Start a check for every due site. A site whose previous check is
    /// still running is skipped; its lock is held by that check.
    pub fn tick(&self, now: DateTime<Local>, tasks: &mut JoinSet<CheckOutcome>) -> usize {
        let mut started = 0;

        for handle in &self.sites {
            let Ok(mut site) = handle.site.clone().try_lock_owned() else {
                tracing::debug!(site = %handle.name, "Previous check still in flight");
                continue;
            };
            if !site.requires_check(now) {
                continue;
            }

            let pipeline = self.pipeline.clone();
            let span = tracing::info_span!("check", site = %handle.name);
            tasks.spawn(async move { pipeline.run(&mut site).await }.instrument(span));
            started += 1;
        }

        if started > 0 {
            tracing::debug!(started, "Scheduler tick");
        }
        started
    }

    /// Run a single tick and wait for the checks it started.
    pub async fn run_once(&self) -> Vec<CheckOutcome> {
        let mut tasks = JoinSet::new();
        self.tick(self.pipeline.now(), &mut tasks);
        drain(&mut tasks).await
    }

    /// Tick on a fixed period until `shutdown` resolves, then wait for the
    /// checks still in flight. The first tick fires immediately.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut timer = interval(self.tick);
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        tracing::info!(sites = self.sites.len(), tick = ?self.tick, "Scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    self.tick(self.pipeline.now(), &mut tasks);
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Check task failed: {}", e);
                    }
                }
            }
        }

        tracing::info!(in_flight = tasks.len(), "Shutting down, waiting for running checks");
        drain(&mut tasks).await;
    }
}

async fn drain(tasks: &mut JoinSet<CheckOutcome>) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => tracing::error!("Check task failed: {}", e),
        }
    }
    outcomes
}
