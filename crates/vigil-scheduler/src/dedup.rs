//! Period deduplication — the authority on "has this destination already
//! been served this period". Scheduler timing can be imprecise (restarts,
//! grace-window wakes); this check is what makes delivery at-most-once
//! per period.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::destination::Destination;

/// Whether a destination is still owed a notification for the period
/// containing `now`.
///
/// `last_notified` is only ever written after a successful dispatch, so a
/// period with a failed attempt stays owed and is retried on the next
/// fire without manual intervention.
pub fn should_notify(destination: &Destination, now: DateTime<Utc>) -> bool {
    match destination.last_notified {
        Some(last) if destination.schedule.same_period(last, now) => {
            debug!(
                "🔁 '{}' already notified this period (last: {})",
                destination.id,
                last.to_rfc3339()
            );
            false
        }
        _ => true,
    }
}
