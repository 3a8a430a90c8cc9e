//! Timestamp normalization to UTC.
//!
//! Values with an explicit offset are converted directly. Naive values are
//! read in the zone the series declares (UTC unless configured otherwise);
//! local times that fall in a DST gap or fold are rejected instead of guessed.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{PipelineError, PipelineResult};
use crate::models::TimePoint;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a timestamp string into a UTC instant.
///
/// # Arguments
/// * `raw` - ISO-8601 / RFC 3339 text, with or without offset
/// * `zone` - Zone used when `raw` carries no offset
///
/// # Returns
/// * `Ok(TimePoint)` in UTC
/// * `Err(PipelineError::MalformedTimestamp)` if unparseable, nonexistent or ambiguous
///
/// # Examples
///
/// ```
/// use soiling_rust::parsing::parse_timestamp;
///
/// let t = parse_timestamp("2024-08-01 12:00:00", chrono_tz::UTC).unwrap();
/// assert_eq!(t.to_rfc3339(), "2024-08-01T12:00:00+00:00");
///
/// let local = parse_timestamp("2024-08-01 08:00:00", chrono_tz::America::Santiago).unwrap();
/// assert_eq!(local.to_rfc3339(), "2024-08-01T12:00:00+00:00");
/// ```
pub fn parse_timestamp(raw: &str, zone: Tz) -> PipelineResult<TimePoint> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(PipelineError::malformed_timestamp("empty timestamp"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    let normalized = normalize_suffix(text);
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return localize(naive, zone, text);
        }
    }

    Err(PipelineError::malformed_timestamp(format!(
        "unrecognized timestamp '{}'",
        text
    )))
}

/// Rewrite trailing `Z` / ` UTC` designators as an explicit offset.
fn normalize_suffix(text: &str) -> String {
    if let Some(stripped) = text.strip_suffix(" UTC") {
        format!("{}+00:00", stripped)
    } else if let Some(stripped) = text.strip_suffix('Z') {
        format!("{}+00:00", stripped)
    } else {
        text.to_string()
    }
}

fn localize(naive: NaiveDateTime, zone: Tz, raw: &str) -> PipelineResult<TimePoint> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, _) => Err(PipelineError::malformed_timestamp(format!(
            "'{}' is ambiguous in {}",
            raw, zone
        ))),
        LocalResult::None => Err(PipelineError::malformed_timestamp(format!(
            "'{}' does not exist in {}",
            raw, zone
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> TimePoint {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let t = parse_timestamp("2024-08-01T09:00:00-03:00", chrono_tz::UTC).unwrap();
        assert_eq!(t, utc("2024-08-01T12:00:00Z"));
    }

    #[test]
    fn test_space_separated_offset() {
        let t = parse_timestamp("2024-08-01 12:00:00+00:00", chrono_tz::UTC).unwrap();
        assert_eq!(t, utc("2024-08-01T12:00:00Z"));
    }

    #[test]
    fn test_fractional_seconds_and_z_suffix() {
        let t = parse_timestamp("2024-08-01 12:00:00.500Z", chrono_tz::UTC).unwrap();
        assert_eq!(t, utc("2024-08-01T12:00:00.500Z"));
    }

    #[test]
    fn test_naive_defaults_to_declared_zone() {
        let t = parse_timestamp("2024-08-01 12:00:00", chrono_tz::UTC).unwrap();
        assert_eq!(t, utc("2024-08-01T12:00:00Z"));

        let t = parse_timestamp("2024-08-01T12:00", chrono_tz::UTC).unwrap();
        assert_eq!(t, utc("2024-08-01T12:00:00Z"));
    }

    #[test]
    fn test_naive_local_time_converted() {
        // Santiago is UTC-4 in August
        let t = parse_timestamp("2024-08-01 08:00:00", chrono_tz::America::Santiago).unwrap();
        assert_eq!(t, utc("2024-08-01T12:00:00Z"));
    }

    #[test]
    fn test_ambiguous_local_time_rejected() {
        // Santiago falls back at 2024-04-07 00:00 local, repeating 23:00-23:59 on the 6th
        let err = parse_timestamp("2024-04-06 23:30:00", chrono_tz::America::Santiago);
        assert!(matches!(err, Err(PipelineError::MalformedTimestamp { .. })));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_timestamp("", chrono_tz::UTC).is_err());
        assert!(parse_timestamp("yesterday", chrono_tz::UTC).is_err());
        assert!(parse_timestamp("2024-13-01 00:00:00", chrono_tz::UTC).is_err());
    }
}
