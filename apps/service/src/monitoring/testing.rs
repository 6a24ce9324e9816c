use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use super::checker::Probe;
use super::executor::Clock;
use super::site::Site;
use super::types::{CheckResult, Direction, ProbeOutcome};
use crate::config::{ContentRequirement, SiteConfig, SiteKind};
use crate::error::ChannelError;
use crate::notify::{Channel, NotificationEvent};

/// Probe answering from per-URL scripts; unscripted URLs answer 200.
#[derive(Default)]
pub struct ScriptedProbe {
    scripts: Mutex<HashMap<String, VecDeque<ProbeOutcome>>>,
    hanging: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn script(&self, url: &str, outcomes: impl IntoIterator<Item = ProbeOutcome>) {
        self.scripts.lock().unwrap().entry(url.to_string()).or_default().extend(outcomes);
    }

    /// Requests to `url` never complete.
    pub fn hang(&self, url: &str) {
        self.hanging.lock().unwrap().insert(url.to_string());
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, url: &str, _timeout: Duration) -> ProbeOutcome {
        self.calls.lock().unwrap().push(url.to_string());
        let hangs = self.hanging.lock().unwrap().contains(url);
        if hangs {
            std::future::pending::<()>().await;
        }
        self.scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| ProbeOutcome::response(200, "ok"))
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    start: DateTime<Local>,
    elapsed_secs: AtomicI64,
}

impl ManualClock {
    pub fn starting_at(start: DateTime<Local>) -> Arc<Self> {
        Arc::new(Self { start, elapsed_secs: AtomicI64::new(0) })
    }

    pub fn advance(&self, by: TimeDelta) {
        self.elapsed_secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    pub fn now(&self) -> DateTime<Local> {
        self.start + TimeDelta::seconds(self.elapsed_secs.load(Ordering::SeqCst))
    }

    pub fn clock(self: &Arc<Self>) -> Clock {
        let this = self.clone();
        Arc::new(move || this.now())
    }
}

/// Channel counting its sends
pub struct RecordingChannel {
    sends: AtomicUsize,
    directions: Mutex<Vec<Direction>>,
    fail: bool,
    allowed: bool,
}

impl Default for RecordingChannel {
    fn default() -> Self {
        Self { sends: AtomicUsize::new(0), directions: Mutex::default(), fail: false, allowed: true }
    }
}

impl RecordingChannel {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn disallowed() -> Self {
        Self { allowed: false, ..Self::default() }
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.directions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn is_allowed(&self, _now: DateTime<Local>) -> bool {
        self.allowed
    }

    async fn send(&self, event: &NotificationEvent<'_>) -> Result<(), ChannelError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.directions.lock().unwrap().push(event.direction);
        if self.fail {
            return Err(ChannelError::Rejected { status: 500, body: "boom".into() });
        }
        Ok(())
    }
}

pub fn site_config(name: &str, content: Option<ContentRequirement>) -> SiteConfig {
    SiteConfig {
        name: name.into(),
        url: format!("https://{}.example", name.to_lowercase()),
        kind: SiteKind::Https,
        content,
        interval: 10,
        timeout: 5,
        quiet_hours: vec![],
    }
}

/// A site that just went down and the result that took it down
pub fn down_event_fixture() -> (Site, CheckResult) {
    let mut site = Site::from_config(&site_config("A", None));
    let now = Local.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let result = site.record(site.url.clone(), ProbeOutcome::response(500, ""), now);
    (site, result)
}
