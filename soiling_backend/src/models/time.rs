//! Instant arithmetic shared by every stage.
//!
//! All series carry UTC instants. Window boundaries are computed on the
//! millisecond timeline so that `floor` never depends on a local calendar.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// A timezone-normalized instant.
pub type TimePoint = DateTime<Utc>;

/// Build a duration from a (possibly fractional) number of minutes.
pub fn minutes(value: f64) -> Duration {
    Duration::milliseconds((value * 60_000.0).round() as i64)
}

/// Absolute distance between two instants in minutes.
pub fn distance_minutes(a: TimePoint, b: TimePoint) -> f64 {
    (a - b).num_milliseconds().abs() as f64 / 60_000.0
}

/// Start of the fixed-width window containing `t`.
///
/// Windows are aligned to the Unix epoch, so a 5-minute window always starts
/// on a multiple of five minutes past the hour.
pub fn floor_to_window(t: TimePoint, width: Duration) -> TimePoint {
    let width_ms = width.num_milliseconds().max(1);
    let ms = t.timestamp_millis();
    let start = ms.div_euclid(width_ms) * width_ms;
    DateTime::<Utc>::from_timestamp_millis(start).unwrap_or(t)
}

/// Calendar day (UTC) of an instant.
pub fn utc_date(t: TimePoint) -> NaiveDate {
    t.date_naive()
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> TimePoint {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Whether a slice of instants is sorted ascending (equal neighbours allowed).
pub fn is_non_decreasing<I>(instants: I) -> bool
where
    I: IntoIterator<Item = TimePoint>,
{
    let mut prev: Option<TimePoint> = None;
    for t in instants {
        if let Some(p) = prev {
            if t < p {
                return false;
            }
        }
        prev = Some(t);
    }
    true
}
