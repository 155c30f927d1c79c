use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock time for the attempt timer.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn from_rfc3339(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// Whole seconds left before `started_at + duration_seconds`, rounded up
/// and clamped at zero. Derived from the clock on every call, so a tick
/// that arrives late still reports the true remaining time.
pub fn remaining_seconds(started_at: DateTime<Utc>, duration_seconds: i64, now: DateTime<Utc>) -> i64 {
    let deadline = started_at + Duration::seconds(duration_seconds);
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + 999) / 1000
    }
}

/// `mm:ss` rendering used by the countdown display.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
