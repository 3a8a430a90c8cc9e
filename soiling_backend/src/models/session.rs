//! Windowed rows, daily solar-noon sessions and aligned module rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::series::{ChannelRecord, Channels, Timestamped};
use super::time::TimePoint;

/// Mean of one fixed-width window of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRow {
    pub window_start: TimePoint,
    pub window_center: TimePoint,
    pub sample_count: usize,
    pub channels: Channels,
}

impl Timestamped for WindowRow {
    fn timestamp(&self) -> TimePoint {
        self.window_start
    }
}

/// The window chosen to represent one calendar day.
///
/// `window_center = window_start + window/2`, and the distance to solar noon
/// never exceeds the configured maximum (days beyond it have no session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySession {
    pub date: NaiveDate,
    pub window_start: TimePoint,
    pub window_center: TimePoint,
    pub solar_noon: TimePoint,
    pub distance_to_solar_noon_minutes: f64,
    pub sample_count: usize,
    pub channels: Channels,
}

impl DailySession {
    /// Exclusive end of the session window.
    pub fn window_end(&self) -> TimePoint {
        self.window_start + (self.window_center - self.window_start) * 2
    }
}

impl Timestamped for DailySession {
    fn timestamp(&self) -> TimePoint {
        self.window_center
    }
}

impl ChannelRecord for DailySession {
    fn channel(&self, name: &str) -> Option<f64> {
        self.channels.get(name).copied().flatten()
    }
}

/// One module's values for one session day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    /// Session center for window averages, the chosen sample's own instant otherwise.
    pub timestamp: TimePoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub channels: Channels,
    /// Distance between the chosen sample and the session center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_minutes: Option<f64>,
    pub sample_count: usize,
}

impl Timestamped for AlignedRow {
    fn timestamp(&self) -> TimePoint {
        self.timestamp
    }
}

impl ChannelRecord for AlignedRow {
    fn channel(&self, name: &str) -> Option<f64> {
        self.channels.get(name).copied().flatten()
    }
}

/// Share of accepted days within a distance band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceBand {
    pub limit_minutes: f64,
    pub count: usize,
    pub percentage: f64,
}

/// Summary of accepted days' distances to solar noon (minutes).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DistanceStats {
    pub days: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p05: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    pub bands: Vec<DistanceBand>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_window_end() {
        let start = Utc.with_ymd_and_hms(2024, 8, 1, 16, 0, 0).unwrap();
        let session = DailySession {
            date: start.date_naive(),
            window_start: start,
            window_center: start + Duration::seconds(150),
            solar_noon: start,
            distance_to_solar_noon_minutes: 2.5,
            sample_count: 5,
            channels: Channels::new(),
        };
        assert_eq!(session.window_end(), start + Duration::minutes(5));
    }
}
