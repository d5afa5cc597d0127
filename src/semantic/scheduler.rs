//! Update scheduling policy.
//!
//! Decides whether a sync pass is due based on the persisted sync state.
//! The policy itself never runs a pass; `SemanticService` spawns one in
//! the background when the scheduler says it is due.

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Never auto-trigger; sync only on explicit request.
    Manual,
    /// Trigger once at process start.
    OnStartup,
    Daily,
    EveryDays(u32),
}

impl UpdatePolicy {
    /// Parse the configuration pair (`update_policy`, `update_days`).
    pub fn parse(policy: &str, days: u32) -> Option<UpdatePolicy> {
        match policy {
            "manual" => Some(UpdatePolicy::Manual),
            "on-startup" => Some(UpdatePolicy::OnStartup),
            "daily" => Some(UpdatePolicy::Daily),
            "every-n-days" if days > 0 => Some(UpdatePolicy::EveryDays(days)),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            UpdatePolicy::Manual => "manual".to_string(),
            UpdatePolicy::OnStartup => "on-startup".to_string(),
            UpdatePolicy::Daily => "daily".to_string(),
            UpdatePolicy::EveryDays(n) => format!("every-{n}-days"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct UpdateScheduler {
    policy: UpdatePolicy,
}

impl UpdateScheduler {
    pub fn new(policy: UpdatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    /// Whether a pass should run now given when the last one finished.
    /// A library that was never synced is always due except under the
    /// manual policy.
    pub fn is_due(&self, last_sync_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let interval = match self.policy {
            UpdatePolicy::Manual => return false,
            UpdatePolicy::OnStartup => return true,
            UpdatePolicy::Daily => Duration::days(1),
            UpdatePolicy::EveryDays(n) => Duration::days(i64::from(n)),
        };

        match last_sync_at {
            None => true,
            Some(last) => now - last >= interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours_ago(h: i64) -> DateTime<Utc> {
        Utc::now() - Duration::hours(h)
    }

    #[test]
    fn parses_policy_strings() {
        assert_eq!(UpdatePolicy::parse("manual", 7), Some(UpdatePolicy::Manual));
        assert_eq!(
            UpdatePolicy::parse("on-startup", 7),
            Some(UpdatePolicy::OnStartup)
        );
        assert_eq!(UpdatePolicy::parse("daily", 7), Some(UpdatePolicy::Daily));
        assert_eq!(
            UpdatePolicy::parse("every-n-days", 3),
            Some(UpdatePolicy::EveryDays(3))
        );
        assert_eq!(UpdatePolicy::parse("every-n-days", 0), None);
        assert_eq!(UpdatePolicy::parse("hourly", 7), None);
    }

    #[test]
    fn manual_never_triggers() {
        let scheduler = UpdateScheduler::new(UpdatePolicy::Manual);
        assert!(!scheduler.is_due(None, Utc::now()));
        assert!(!scheduler.is_due(Some(hours_ago(24 * 365)), Utc::now()));
    }

    #[test]
    fn on_startup_always_triggers() {
        let scheduler = UpdateScheduler::new(UpdatePolicy::OnStartup);
        assert!(scheduler.is_due(None, Utc::now()));
        assert!(scheduler.is_due(Some(Utc::now()), Utc::now()));
    }

    #[test]
    fn daily_triggers_after_a_day() {
        let scheduler = UpdateScheduler::new(UpdatePolicy::Daily);
        assert!(scheduler.is_due(None, Utc::now()));
        assert!(!scheduler.is_due(Some(hours_ago(2)), Utc::now()));
        assert!(scheduler.is_due(Some(hours_ago(25)), Utc::now()));
    }

    #[test]
    fn every_n_days_uses_configured_interval() {
        let scheduler = UpdateScheduler::new(UpdatePolicy::EveryDays(3));
        assert!(!scheduler.is_due(Some(hours_ago(24 * 2)), Utc::now()));
        assert!(scheduler.is_due(Some(hours_ago(24 * 3 + 1)), Utc::now()));
    }
}
