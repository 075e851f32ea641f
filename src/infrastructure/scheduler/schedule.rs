//! Due-time bookkeeping for the periodic key tasks
//!
//! Pure over injected timestamps so cadence rules are testable without a
//! runtime or a real clock.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

const SECS_PER_DAY: i64 = 86_400;

/// Periodic work the scheduler knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduledTask {
    /// Bulk issuance at a fixed UTC time of day
    DailyIssue,
    /// Sweep expired keys, then replenish the pool
    Rotation,
}

impl ScheduledTask {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DailyIssue => "daily_issue",
            Self::Rotation => "rotation",
        }
    }
}

impl std::fmt::Display for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Scheduler cadence and batch settings
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// UTC time of day for the daily batch
    pub daily_at: NaiveTime,
    /// Seconds between rotations
    pub rotation_interval_secs: i64,
    /// How often the timer checks for due tasks
    pub poll_interval: Duration,
    /// Keys per issued batch
    pub batch_size: usize,
    /// Sweep expired keys before every batch, not only on rotation
    pub sweep_before_issue: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            // 00:00 UTC
            daily_at: NaiveTime::default(),
            rotation_interval_secs: 3_600,
            poll_interval: Duration::from_secs(1),
            batch_size: 100,
            sweep_before_issue: true,
        }
    }
}

/// First occurrence of `at` (UTC) strictly after `now`
pub fn next_daily_after(now: i64, at: NaiveTime) -> i64 {
    let Some(now_dt) = DateTime::<Utc>::from_timestamp(now, 0) else {
        return now.saturating_add(SECS_PER_DAY);
    };

    let today = now_dt.date_naive().and_time(at).and_utc().timestamp();

    if today > now {
        today
    } else {
        today + SECS_PER_DAY
    }
}

/// Tracks when each task is next due.
///
/// A task that is overdue by several periods fires once and is then
/// rescheduled relative to the current time; missed runs are not replayed.
#[derive(Debug, Clone)]
pub struct DueTracker {
    daily_at: NaiveTime,
    rotation_interval_secs: i64,
    next_daily: i64,
    next_rotation: i64,
}

impl DueTracker {
    pub fn new(daily_at: NaiveTime, rotation_interval_secs: i64, now: i64) -> Self {
        Self {
            daily_at,
            rotation_interval_secs,
            next_daily: next_daily_after(now, daily_at),
            next_rotation: now.saturating_add(rotation_interval_secs),
        }
    }

    pub fn from_config(config: &ScheduleConfig, now: i64) -> Self {
        Self::new(config.daily_at, config.rotation_interval_secs, now)
    }

    pub fn next_daily(&self) -> i64 {
        self.next_daily
    }

    pub fn next_rotation(&self) -> i64 {
        self.next_rotation
    }

    /// Tasks due at `now`, earliest due first, and advance their deadlines
    pub fn poll(&mut self, now: i64) -> Vec<ScheduledTask> {
        let mut due = Vec::with_capacity(2);

        if now >= self.next_daily {
            due.push((self.next_daily, ScheduledTask::DailyIssue));
            self.next_daily = next_daily_after(now, self.daily_at);
        }

        if now >= self.next_rotation {
            due.push((self.next_rotation, ScheduledTask::Rotation));
            self.next_rotation = now.saturating_add(self.rotation_interval_secs);
        }

        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, task)| task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2023-11-14T22:13:20Z
    const T0: i64 = 1_700_000_000;
    // 2023-11-15T00:00:00Z
    const NEXT_MIDNIGHT: i64 = 1_700_006_400;

    fn midnight() -> NaiveTime {
        NaiveTime::from_hms_opt(0, 0, 0).unwrap()
    }

    // Next occurrence is 2023-11-15T12:00:00Z, clear of the hourly windows below
    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_next_daily_after() {
        assert_eq!(next_daily_after(T0, midnight()), NEXT_MIDNIGHT);

        // Exactly at the scheduled time rolls over to tomorrow
        assert_eq!(
            next_daily_after(NEXT_MIDNIGHT, midnight()),
            NEXT_MIDNIGHT + SECS_PER_DAY
        );

        // Later today
        let at = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert_eq!(next_daily_after(T0, at), NEXT_MIDNIGHT - 1_800);
    }

    #[test]
    fn test_initial_deadlines() {
        let tracker = DueTracker::new(midnight(), 3_600, T0);

        assert_eq!(tracker.next_daily(), NEXT_MIDNIGHT);
        assert_eq!(tracker.next_rotation(), T0 + 3_600);
    }

    #[test]
    fn test_nothing_due_before_deadlines() {
        let mut tracker = DueTracker::new(midnight(), 3_600, T0);

        assert!(tracker.poll(T0).is_empty());
        assert!(tracker.poll(T0 + 3_599).is_empty());
    }

    #[test]
    fn test_rotation_fires_hourly() {
        let mut tracker = DueTracker::new(noon(), 3_600, T0);

        assert_eq!(tracker.poll(T0 + 3_600), vec![ScheduledTask::Rotation]);
        assert!(tracker.poll(T0 + 3_601).is_empty());
        assert_eq!(tracker.poll(T0 + 7_200), vec![ScheduledTask::Rotation]);
        assert_eq!(tracker.poll(T0 + 10_800), vec![ScheduledTask::Rotation]);
    }

    #[test]
    fn test_hourly_poll_crossing_daily_time_fires_both() {
        let mut tracker = DueTracker::new(midnight(), 3_600, T0);

        assert_eq!(tracker.poll(T0 + 3_600), vec![ScheduledTask::Rotation]);

        // T0 + 7200 is 00:13:20, past the daily batch at midnight
        assert_eq!(
            tracker.poll(T0 + 7_200),
            vec![ScheduledTask::DailyIssue, ScheduledTask::Rotation]
        );
    }

    #[test]
    fn test_daily_fires_once_per_day() {
        let mut tracker = DueTracker::new(midnight(), 1_000_000, T0);

        assert_eq!(tracker.poll(NEXT_MIDNIGHT), vec![ScheduledTask::DailyIssue]);
        assert!(tracker.poll(NEXT_MIDNIGHT + 1).is_empty());
        assert_eq!(tracker.next_daily(), NEXT_MIDNIGHT + SECS_PER_DAY);
    }

    #[test]
    fn test_both_due_in_deadline_order() {
        let mut tracker = DueTracker::new(midnight(), 3_600, T0);

        // Rotation was due at T0+3600, the daily batch only at midnight
        let due = tracker.poll(NEXT_MIDNIGHT + 10);
        assert_eq!(due, vec![ScheduledTask::Rotation, ScheduledTask::DailyIssue]);
    }

    #[test]
    fn test_missed_periods_fire_once() {
        let mut tracker = DueTracker::new(midnight(), 3_600, T0);
        let much_later = T0 + 10 * SECS_PER_DAY;

        let due = tracker.poll(much_later);
        assert_eq!(due.len(), 2);

        assert!(tracker.poll(much_later + 1).is_empty());
        assert_eq!(tracker.next_rotation(), much_later + 3_600);
    }

    #[test]
    fn test_clock_moving_backwards_fires_nothing() {
        let mut tracker = DueTracker::new(midnight(), 3_600, T0);
        assert!(tracker.poll(T0 - 100_000).is_empty());
    }

    #[test]
    fn test_task_names() {
        assert_eq!(ScheduledTask::DailyIssue.to_string(), "daily_issue");
        assert_eq!(ScheduledTask::Rotation.name(), "rotation");
    }
}
