//! Destination definitions — the core data model for scheduled delivery.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification target with its own schedule and last-notified state.
/// Owned by the schedule store; the engine works on snapshots and writes
/// back only through store operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// Opaque identifier (group id, chat id, ...). Caller-supplied.
    pub id: String,
    /// Whether this destination currently receives notifications.
    pub enabled: bool,
    /// When/how often to deliver.
    pub schedule: Schedule,
    /// Last successful delivery. Only ever moves forward, and only after
    /// a dispatch actually succeeded.
    pub last_notified: Option<DateTime<Utc>>,
}

impl Destination {
    /// Create an enabled destination with a daily schedule.
    pub fn daily(id: &str, at: NaiveTime) -> Self {
        Self {
            id: id.to_string(),
            enabled: true,
            schedule: Schedule::Daily { at },
            last_notified: None,
        }
    }

    /// Create an enabled destination firing every `secs` seconds. The
    /// interval is clamped into `1..=MAX_INTERVAL_SECS`.
    pub fn every(id: &str, secs: u64) -> Self {
        Self {
            id: id.to_string(),
            enabled: true,
            schedule: Schedule::Every {
                secs: clamp_secs(secs),
            },
            last_notified: None,
        }
    }
}

/// Longest accepted interval: one year. `chrono` durations overflow far
/// below `u64::MAX` seconds, so intervals are clamped here rather than
/// trusted from input or persisted records.
pub const MAX_INTERVAL_SECS: u64 = 366 * 86_400;

fn clamp_secs(secs: u64) -> u64 {
    secs.clamp(1, MAX_INTERVAL_SECS)
}

/// When a destination fires. Times of day are UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Schedule {
    /// Once a day at a fixed time.
    Daily { at: NaiveTime },
    /// Every N seconds. Clamped on load; a hand-edited store record
    /// cannot smuggle in an interval the occurrence math rejects.
    Every {
        #[serde(deserialize_with = "de_clamped_secs")]
        secs: u64,
    },
}

fn de_clamped_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(clamp_secs(u64::deserialize(deserializer)?))
}

impl Schedule {
    /// The first fire time strictly after `now`.
    pub fn first_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Schedule::Daily { at } => {
                let today = now.date_naive().and_time(*at).and_utc();
                if today > now {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            Schedule::Every { secs } => now + interval(*secs),
        }
    }

    /// The occurrence after a fire that was scheduled for `scheduled`.
    /// Advances by whole periods from the scheduled time — never from
    /// "now" — so daily destinations keep their configured time of day.
    /// Skips forward past any occurrences that are already in the past.
    pub fn next_after_fire(&self, scheduled: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let period = match self {
            Schedule::Daily { .. } => Duration::days(1),
            Schedule::Every { secs } => interval(*secs),
        };
        let mut next = scheduled + period;
        while next <= now {
            next += period;
        }
        next
    }

    /// Whether two instants fall in the same recurrence period: the same
    /// UTC calendar day for daily schedules, the same epoch-aligned bucket
    /// for interval schedules.
    pub fn same_period(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        match self {
            Schedule::Daily { .. } => a.date_naive() == b.date_naive(),
            Schedule::Every { secs } => {
                let secs = i64::try_from(clamp_secs(*secs)).unwrap_or(1);
                a.timestamp().div_euclid(secs) == b.timestamp().div_euclid(secs)
            }
        }
    }
}

/// Interval as a chrono duration. Clamping keeps the conversion inside
/// the range `Duration::seconds` accepts.
fn interval(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(clamp_secs(secs)).unwrap_or(1))
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Schedule::Every { secs } => write!(f, "every {secs}s"),
        }
    }
}
