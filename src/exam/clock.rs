// src/exam/clock.rs

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::Serialize;

/// Start time of an exam as read back from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTime {
    /// The stored timestamp parsed cleanly.
    Recorded(DateTime<Utc>),
    /// The stored timestamp was unreadable and "now" was used instead.
    /// The exam restarts with its full time budget.
    Fallback(DateTime<Utc>),
}

impl StartTime {
    pub fn instant(self) -> DateTime<Utc> {
        match self {
            StartTime::Recorded(at) | StartTime::Fallback(at) => at,
        }
    }
}

/// Formats an instant the way it is stored in the session.
pub fn format_start_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

/// Reads a stored start time.
///
/// Accepts RFC 3339 and offset-less ISO-8601 (read as UTC). Anything else
/// falls back to `now` instead of failing the request.
pub fn resolve_start_time(raw: &str, now: DateTime<Utc>) -> StartTime {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return StartTime::Recorded(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return StartTime::Recorded(naive.and_utc());
        }
    }

    tracing::warn!(start_time = raw, "Unreadable exam start time, restarting the clock from now");
    StartTime::Fallback(now)
}

/// Remaining time of a running exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    /// Seconds left, floored at zero.
    pub time_remaining: i64,
    pub expired: bool,
}

impl Countdown {
    /// A limit reaching past the representable calendar never expires.
    pub fn new(start: DateTime<Utc>, time_limit_minutes: i64, now: DateTime<Utc>) -> Self {
        let end = TimeDelta::try_minutes(time_limit_minutes)
            .and_then(|limit| start.checked_add_signed(limit))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        // Truncates toward zero, so 0.5s left already counts as expired.
        let remaining = (end - now).num_seconds();
        Self {
            time_remaining: remaining.max(0),
            expired: remaining <= 0,
        }
    }
}
