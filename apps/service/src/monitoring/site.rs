//! Per-site health state machine.
//!
//! A [`Site`] owns its runtime state and is only ever mutated by the check
//! sequence that currently holds it, so no interior locking lives here.

use chrono::{DateTime, Local, TimeDelta, Timelike};
use std::time::Duration;

use super::types::{CheckResult, Direction, ProbeOutcome, SiteStatus};
use crate::config::{ContentRequirement, SiteConfig};
use crate::error::CheckError;

/// Token in a site URL replaced by the current Unix time in seconds
pub const EPOCH_PLACEHOLDER: &str = "[EPOCH]";

/// Minimum gap between two down reminders
pub const REMINDER_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Mutable runtime state of a site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteState {
    pub last_run: Option<DateTime<Local>>,
    pub status: SiteStatus,
    /// Status before the most recent classification
    pub previous_status: SiteStatus,
    /// Start of the outage, then time of the last reminder. `None` while up.
    pub last_reminder: Option<DateTime<Local>>,
}

#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub url: String,
    pub content: Option<ContentRequirement>,
    pub interval: Duration,
    pub timeout: Duration,
    pub quiet_hours: Vec<u32>,
    pub state: SiteState,
}

impl Site {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            content: config.content.clone().and_then(ContentRequirement::normalized),
            interval: Duration::from_secs(config.interval),
            timeout: Duration::from_secs(config.timeout),
            quiet_hours: config.quiet_hours.clone(),
            state: SiteState::default(),
        }
    }

    pub fn is_down(&self) -> bool {
        self.state.status == SiteStatus::Down
    }

    pub fn was_down(&self) -> bool {
        self.state.previous_status == SiteStatus::Down
    }

    /// URL with the epoch placeholder substituted
    pub fn resolved_url(&self, now: DateTime<Local>) -> String {
        self.url.replace(EPOCH_PLACEHOLDER, &now.timestamp().to_string())
    }

    /// Whether the scheduler should start a check now.
    pub fn requires_check(&self, now: DateTime<Local>) -> bool {
        if self.quiet_hours.contains(&now.hour()) {
            return false;
        }
        match self.state.last_run {
            None => true,
            Some(last_run) => TimeDelta::from_std(self.interval)
                .map(|interval| now >= last_run + interval)
                .unwrap_or(false),
        }
    }

    /// Whether a down reminder is due. Returning `true` records `now` as the
    /// reminder time, so a second call within the hour returns `false`.
    pub fn requires_reminder(&mut self, now: DateTime<Local>) -> bool {
        if !self.is_down() {
            return false;
        }
        let due = match self.state.last_reminder {
            None => true,
            Some(last) => (now - last).to_std().is_ok_and(|gap| gap > REMINDER_INTERVAL),
        };
        if due {
            self.state.last_reminder = Some(now);
        }
        due
    }

    /// Mark the start of a probe
    pub fn mark_run(&mut self, now: DateTime<Local>) {
        self.state.last_run = Some(now);
    }

    /// Decide up or down for a probe result. Content matching must already
    /// have been evaluated.
    pub fn classify(&self, result: &CheckResult) -> Result<(), CheckError> {
        if result.connect_timeout {
            return Err(CheckError::ConnectTimeout { seconds: self.timeout.as_secs() });
        }
        if result.connect_failed {
            return Err(CheckError::ConnectFailure);
        }
        match result.status_code {
            Some(304) | Some(200..=299) => {}
            Some(code) => return Err(CheckError::UnexpectedStatus(code)),
            None => return Err(CheckError::ConnectFailure),
        }
        if result.content_matched == Some(false) {
            return Err(CheckError::ContentMismatch { missing: self.missing_content(result) });
        }
        Ok(())
    }

    /// Required substrings absent from the body
    fn missing_content(&self, result: &CheckResult) -> Vec<String> {
        let body = result.body.as_deref().unwrap_or_default();
        match &self.content {
            None => Vec::new(),
            Some(ContentRequirement::Single(needle)) => {
                if body.contains(needle.as_str()) { Vec::new() } else { vec![needle.clone()] }
            }
            Some(ContentRequirement::All(needles)) => needles
                .iter()
                .filter(|needle| !body.contains(needle.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Turn a probe outcome into a check result and apply it to the state.
    pub fn record(
        &mut self,
        url: String,
        outcome: ProbeOutcome,
        now: DateTime<Local>,
    ) -> CheckResult {
        let mut result = CheckResult::new(url, now, outcome);

        if self.content.is_some() && result.body.is_some() {
            result.content_matched = Some(self.missing_content(&result).is_empty());
        }

        self.state.previous_status = self.state.status;

        match self.classify(&result) {
            Ok(()) => {
                result.status = SiteStatus::Up;
                self.state.status = SiteStatus::Up;
                self.state.last_reminder = None;
            }
            Err(failure) => {
                result.status = SiteStatus::Down;
                result.notes = failure.to_string();
                result.failure = Some(failure);
                self.state.status = SiteStatus::Down;
                if self.state.last_reminder.is_none() {
                    self.state.last_reminder = Some(now);
                }
            }
        }

        result
    }

    /// Notification signal after a first probe, if any.
    pub fn signal(&mut self, now: DateTime<Local>) -> Option<Direction> {
        match (self.is_down(), self.was_down()) {
            (true, false) => Some(Direction::Down),
            (false, true) => Some(Direction::Up),
            (true, true) => self.requires_reminder(now).then_some(Direction::Down),
            (false, false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteKind;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn site(content: Option<ContentRequirement>, quiet_hours: Vec<u32>) -> Site {
        Site::from_config(&SiteConfig {
            name: "A".into(),
            url: "https://example.com/?t=[EPOCH]".into(),
            kind: SiteKind::Https,
            content,
            interval: 10,
            timeout: 5,
            quiet_hours,
        })
    }

    fn record(site: &mut Site, outcome: ProbeOutcome, now: DateTime<Local>) -> CheckResult {
        site.record("https://example.com".into(), outcome, now)
    }

    #[test]
    fn quiet_hours_block_checks_regardless_of_interval() {
        let mut s = site(None, vec![12]);
        assert!(!s.requires_check(at(12, 30)));
        s.mark_run(at(10, 0));
        assert!(!s.requires_check(at(12, 59)));
        assert!(s.requires_check(at(13, 0)));
    }

    #[test]
    fn interval_elapses_inclusively() {
        let mut s = site(None, vec![]);
        assert!(s.requires_check(at(9, 0)));
        s.mark_run(at(9, 0));
        assert!(!s.requires_check(at(9, 0) + TimeDelta::seconds(9)));
        assert!(s.requires_check(at(9, 0) + TimeDelta::seconds(10)));
    }

    #[test]
    fn epoch_placeholder_is_resolved() {
        let s = site(None, vec![]);
        let now = at(9, 0);
        assert_eq!(s.resolved_url(now), format!("https://example.com/?t={}", now.timestamp()));
    }

    #[test]
    fn connect_failure_and_timeout_are_down() {
        let mut s = site(None, vec![]);
        let r = record(&mut s, ProbeOutcome::connect_failed(), at(9, 0));
        assert!(r.is_down());
        assert_eq!(r.failure, Some(CheckError::ConnectFailure));
        assert!(r.notes.contains("Could not connect"));

        let r = record(&mut s, ProbeOutcome::timed_out(Duration::from_secs(5)), at(9, 1));
        assert_eq!(r.failure, Some(CheckError::ConnectTimeout { seconds: 5 }));
    }

    #[test]
    fn status_codes_outside_2xx_and_304_are_down() {
        let mut s = site(None, vec![]);
        assert!(!record(&mut s, ProbeOutcome::response(204, ""), at(9, 0)).is_down());
        assert!(!record(&mut s, ProbeOutcome::response(304, ""), at(9, 0)).is_down());

        let r = record(&mut s, ProbeOutcome::response(301, ""), at(9, 0));
        assert_eq!(r.failure, Some(CheckError::UnexpectedStatus(301)));
        assert_eq!(r.notes, "Unexpected status code 301 was returned");
    }

    #[test]
    fn multi_substring_requires_all() {
        let mut s = site(Some(ContentRequirement::All(vec!["foo".into(), "bar".into()])), vec![]);
        let r = record(&mut s, ProbeOutcome::response(200, "only foo here"), at(9, 0));

        assert_eq!(r.content_matched, Some(false));
        assert!(r.is_down());
        assert!(r.notes.contains("bar not found in body."));
        assert!(!r.notes.contains("foo not found"));

        let r = record(&mut s, ProbeOutcome::response(200, "foo and bar"), at(9, 1));
        assert_eq!(r.content_matched, Some(true));
        assert!(!r.is_down());
    }

    #[test]
    fn single_substring_and_no_requirement() {
        let mut s = site(Some(ContentRequirement::Single("ok".into())), vec![]);
        let r = record(&mut s, ProbeOutcome::response(200, "nope"), at(9, 0));
        assert_eq!(r.failure, Some(CheckError::ContentMismatch { missing: vec!["ok".into()] }));

        let mut s = site(None, vec![]);
        let r = record(&mut s, ProbeOutcome::response(200, "anything"), at(9, 0));
        assert_eq!(r.content_matched, None);
    }

    #[test]
    fn outage_start_sets_reminder_once() {
        let mut s = site(None, vec![]);
        record(&mut s, ProbeOutcome::response(500, ""), at(9, 0));
        assert_eq!(s.state.last_reminder, Some(at(9, 0)));
        assert!(s.is_down() && !s.was_down());

        record(&mut s, ProbeOutcome::response(500, ""), at(9, 5));
        assert_eq!(s.state.last_reminder, Some(at(9, 0)));
        assert!(s.was_down());

        record(&mut s, ProbeOutcome::response(200, ""), at(9, 10));
        assert_eq!(s.state.last_reminder, None);
    }

    #[test]
    fn reminder_at_most_once_per_hour() {
        let mut s = site(None, vec![]);
        record(&mut s, ProbeOutcome::response(500, ""), at(9, 0));

        assert!(!s.requires_reminder(at(9, 30)));
        assert!(!s.requires_reminder(at(10, 0)));
        assert!(s.requires_reminder(at(10, 1)));
        assert!(!s.requires_reminder(at(10, 2)));
        assert!(s.requires_reminder(at(11, 2)));
    }

    #[test]
    fn reminder_never_fires_while_up() {
        let mut s = site(None, vec![]);
        record(&mut s, ProbeOutcome::response(200, ""), at(9, 0));
        assert!(!s.requires_reminder(at(12, 0)));
    }

    #[test]
    fn signal_follows_transitions() {
        let mut s = site(None, vec![]);
        record(&mut s, ProbeOutcome::response(200, ""), at(9, 0));
        assert_eq!(s.signal(at(9, 0)), None);

        record(&mut s, ProbeOutcome::response(500, ""), at(9, 1));
        assert_eq!(s.signal(at(9, 1)), Some(Direction::Down));

        record(&mut s, ProbeOutcome::response(500, ""), at(9, 2));
        assert_eq!(s.signal(at(9, 2)), None);

        record(&mut s, ProbeOutcome::response(500, ""), at(10, 2));
        assert_eq!(s.signal(at(10, 2)), Some(Direction::Down));

        record(&mut s, ProbeOutcome::response(200, ""), at(10, 3));
        assert_eq!(s.signal(at(10, 3)), Some(Direction::Up));
    }
}
