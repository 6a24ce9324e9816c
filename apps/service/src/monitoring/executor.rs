use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;

use super::checker::Probe;
use super::site::Site;
use super::types::{CheckResult, Direction, SiteStatus};
use crate::database::HistorySink;
use crate::notify::{DispatchReport, Dispatcher, NotificationEvent};

/// How one check sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No signal; the site stayed in this state
    Steady(SiteStatus),
    /// Confirmed signal, fanned out to the channels
    Notified { direction: Direction, report: DispatchReport },
    /// The confirmation probe contradicted the first one
    FalseAlarm(Direction),
}

/// Wall-clock source for probe timestamps, reminders and quiet hours
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Runs the probe, confirmation and dispatch sequence for one site
pub struct CheckPipeline {
    probe: Arc<dyn Probe>,
    sink: Arc<dyn HistorySink>,
    dispatcher: Arc<Dispatcher>,
    confirmation_delay: Duration,
    clock: Clock,
}

impl CheckPipeline {
    pub fn new(
        probe: Arc<dyn Probe>,
        sink: Arc<dyn HistorySink>,
        dispatcher: Arc<Dispatcher>,
        confirmation_delay: Duration,
    ) -> Self {
        Self { probe, sink, dispatcher, confirmation_delay, clock: Arc::new(Local::now) }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Local> {
        (self.clock)()
    }

    /// Check `site` once, confirming any signal with a second probe before
    /// notifying. The caller must hold the site exclusively for the whole
    /// sequence.
    pub async fn run(&self, site: &mut Site) -> CheckOutcome {
        let first = self.probe_site(site).await;
        let signal = site.signal(self.now());

        self.log_result(site, &first).await;

        let Some(direction) = signal else {
            tracing::debug!(site = %site.name, status = %first.status, "No state change");
            return CheckOutcome::Steady(first.status);
        };

        tracing::info!(
            site = %site.name,
            direction = %direction,
            notes = %first.notes,
            "Signal raised, confirming"
        );
        tokio::time::sleep(self.confirmation_delay).await;

        let second = self.probe_site(site).await;
        self.log_result(site, &second).await;

        // The second probe moved the first probe's status into previous_status.
        if site.state.status != site.state.previous_status {
            tracing::info!(site = %site.name, direction = %direction, "False alarm, notification suppressed");
            self.sink.log_false_alarm(site).await;
            return CheckOutcome::FalseAlarm(direction);
        }

        let event = NotificationEvent { direction, site, result: &second };
        let report = self.dispatcher.dispatch(&event, self.now()).await;
        CheckOutcome::Notified { direction, report }
    }

    async fn log_result(&self, site: &Site, result: &CheckResult) {
        if result.is_down() {
            self.sink.log_failure(site, result).await;
        } else {
            self.sink.log_success(site, result).await;
        }
    }

    async fn probe_site(&self, site: &mut Site) -> CheckResult {
        let started = self.now();
        site.mark_run(started);
        let url = site.resolved_url(started);

        let outcome = self.probe.probe(&url, site.timeout).await;
        let result = site.record(url, outcome, self.now());

        tracing::debug!(
            site = %site.name,
            status = %result.status,
            status_code = ?result.status_code,
            response_ms = result.response_time_ms,
            "Probe finished"
        );
        result
    }
}
