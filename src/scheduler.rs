//! Conditional interval scheduler.
//!
//! Resolves the sampling interval for the next cycle from a baseline and an
//! ordered list of [`IntervalRule`]s keyed on weekday and hour of day.

use std::time::Duration;

use chrono::{Datelike, Local, NaiveDateTime, Timelike, Weekday};

/// A time-scoped override of the baseline interval.
///
/// Unset bounds always match; a rule without bounds matches every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRule {
    pub name: Option<String>,
    pub day_of_week: Option<Weekday>,
    /// Inclusive lower hour bound.
    pub from_hour: Option<u32>,
    /// Inclusive upper hour bound.
    pub until_hour: Option<u32>,
    pub priority: i64,
    pub interval_secs: f64,
}

impl IntervalRule {
    /// Create an unbounded rule with priority 1.
    pub fn new(interval_secs: f64) -> Self {
        Self {
            name: None,
            day_of_week: None,
            from_hour: None,
            until_hour: None,
            priority: 1,
            interval_secs,
        }
    }

    /// Set a label used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restrict to one weekday.
    pub fn on(mut self, day: Weekday) -> Self {
        self.day_of_week = Some(day);
        self
    }

    /// Match only from this hour on.
    pub fn from_hour(mut self, hour: u32) -> Self {
        self.from_hour = Some(hour);
        self
    }

    /// Match only until this hour (inclusive).
    pub fn until_hour(mut self, hour: u32) -> Self {
        self.until_hour = Some(hour);
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Whether the rule applies at `now`.
    pub fn matches(&self, now: &NaiveDateTime) -> bool {
        let hour = now.hour();
        self.day_of_week.is_none_or(|d| d == now.weekday())
            && self.from_hour.is_none_or(|h| hour >= h)
            && self.until_hour.is_none_or(|h| hour <= h)
    }
}

/// Picks the interval for the next wait and remembers the last one picked.
#[derive(Debug, Clone)]
pub struct IntervalScheduler {
    baseline_secs: f64,
    rules: Vec<IntervalRule>,
    last_interval_secs: f64,
}

impl IntervalScheduler {
    /// Create a scheduler with no conditional rules.
    pub fn new(baseline_secs: f64) -> Self {
        Self {
            baseline_secs,
            rules: Vec::new(),
            last_interval_secs: 0.0,
        }
    }

    /// Replace the rule set. Order matters for ties.
    pub fn with_rules(mut self, rules: Vec<IntervalRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn baseline_secs(&self) -> f64 {
        self.baseline_secs
    }

    /// Interval selected by the most recent wait; 0 before the first wait.
    pub fn last_interval_secs(&self) -> f64 {
        self.last_interval_secs
    }

    /// Resolve the interval that applies at `now`.
    ///
    /// Among matching rules the highest priority wins; on equal priority the
    /// later rule wins. A rule must reach priority 0 to displace the baseline.
    pub fn resolve_interval(&self, now: &NaiveDateTime) -> f64 {
        let mut priority = 0;
        let mut interval = self.baseline_secs;

        for rule in self.rules.iter().filter(|r| r.matches(now)) {
            if rule.priority >= priority {
                priority = rule.priority;
                interval = rule.interval_secs;
            }
        }

        interval
    }

    /// Resolve the interval for the current local time, sleep for it and
    /// record it. Returns the interval in seconds.
    ///
    /// The sleep always runs to completion.
    pub async fn wait_and_record(&mut self) -> f64 {
        let now = Local::now().naive_local();
        let secs = self.resolve_interval(&now);
        self.last_interval_secs = secs;

        tracing::debug!(interval_secs = secs, "Waiting for next sampling cycle");
        let duration = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX);
        tokio::time::sleep(duration).await;
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// 2024-01-01 is a Monday.
    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn office_scheduler() -> IntervalScheduler {
        IntervalScheduler::new(5.0).with_rules(vec![
            IntervalRule::new(10.0).on(Weekday::Mon).with_priority(1),
            IntervalRule::new(30.0)
                .from_hour(9)
                .until_hour(17)
                .with_priority(2),
        ])
    }

    #[test]
    fn test_higher_priority_wins() {
        assert_eq!(office_scheduler().resolve_interval(&at(1, 10)), 30.0);
    }

    #[test]
    fn test_only_weekday_rule_matches() {
        assert_eq!(office_scheduler().resolve_interval(&at(1, 20)), 10.0);
    }

    #[test]
    fn test_nothing_matches_uses_baseline() {
        assert_eq!(office_scheduler().resolve_interval(&at(2, 20)), 5.0);
    }

    #[test]
    fn test_equal_priority_later_rule_wins() {
        let scheduler = IntervalScheduler::new(5.0).with_rules(vec![
            IntervalRule::new(10.0).with_priority(3),
            IntervalRule::new(20.0).with_priority(3),
        ]);
        assert_eq!(scheduler.resolve_interval(&at(3, 12)), 20.0);
    }

    #[test]
    fn test_lower_priority_later_rule_loses() {
        let scheduler = IntervalScheduler::new(5.0).with_rules(vec![
            IntervalRule::new(10.0).with_priority(3),
            IntervalRule::new(20.0).with_priority(2),
        ]);
        assert_eq!(scheduler.resolve_interval(&at(3, 12)), 10.0);
    }

    #[test]
    fn test_hour_bounds_are_inclusive() {
        let rule = IntervalRule::new(1.0).from_hour(9).until_hour(17);
        assert!(rule.matches(&at(1, 9)));
        assert!(rule.matches(&at(1, 17)));
        assert!(!rule.matches(&at(1, 8)));
        assert!(!rule.matches(&at(1, 18)));
    }

    #[test]
    fn test_unbounded_rule_matches_everything() {
        let rule = IntervalRule::new(1.0);
        assert!(rule.matches(&at(1, 0)));
        assert!(rule.matches(&at(7, 23)));
    }

    #[test]
    fn test_negative_priority_never_selected() {
        let scheduler =
            IntervalScheduler::new(5.0).with_rules(vec![IntervalRule::new(60.0).with_priority(-1)]);
        assert_eq!(scheduler.resolve_interval(&at(1, 12)), 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_and_record() {
        let mut scheduler = IntervalScheduler::new(7.0);
        assert_eq!(scheduler.last_interval_secs(), 0.0);

        let start = tokio::time::Instant::now();
        let secs = scheduler.wait_and_record().await;

        assert_eq!(secs, 7.0);
        assert_eq!(scheduler.last_interval_secs(), 7.0);
        assert!(start.elapsed() >= Duration::from_secs(7));
    }
}
