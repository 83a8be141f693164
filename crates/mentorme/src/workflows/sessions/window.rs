//! Fixed timing policy for session confirmations.

use chrono::{DateTime, Duration, Utc};

/// How early a party may confirm the start of a session.
pub const START_WINDOW_MINUTES_BEFORE: i64 = 15;
/// How late a party may still confirm the start of a session.
pub const START_WINDOW_MINUTES_AFTER: i64 = 60;
/// How long a one-sided confirmation may stay unanswered before the session is disputed.
pub const DISPUTE_THRESHOLD_HOURS: i64 = 6;

/// Inclusive bounds during which a start confirmation is accepted.
pub fn start_window(scheduled_start_at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        scheduled_start_at - Duration::minutes(START_WINDOW_MINUTES_BEFORE),
        scheduled_start_at + Duration::minutes(START_WINDOW_MINUTES_AFTER),
    )
}

pub fn within_start_window(scheduled_start_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let (opens, closes) = start_window(scheduled_start_at);
    now >= opens && now <= closes
}

/// Completion may be confirmed from the scheduled end onwards.
pub fn completion_open(scheduled_end_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= scheduled_end_at
}

pub fn dispute_threshold() -> Duration {
    Duration::hours(DISPUTE_THRESHOLD_HOURS)
}
