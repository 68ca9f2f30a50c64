//! Timestamp capture at the precision the persisted form keeps.

use chrono::{DateTime, Utc};
use mockable::Clock;

/// Reads the clock truncated to whole milliseconds.
///
/// Stored dates carry millisecond precision, so stamping at the same
/// precision keeps a reloaded record equal to the one that was saved.
pub(crate) fn stamp(clock: &(impl Clock + ?Sized)) -> DateTime<Utc> {
    let now = clock.utc();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
