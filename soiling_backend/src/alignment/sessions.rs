//! Selection of one session window per day, closest to solar noon.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::stats::compute_distance_stats;
use crate::models::time::{distance_minutes, utc_date};
use crate::models::{DailySession, DistanceStats, WindowRow};
use crate::solar::SolarGeometryProvider;

/// A day whose closest window was beyond the distance gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardedDay {
    pub date: NaiveDate,
    pub distance_minutes: f64,
}

/// Sessions, their distance statistics and the days left out.
///
/// `stats` covers every day that passed the distance gate, including days a
/// later current guard or stability gate removes.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSelection {
    pub sessions: Vec<DailySession>,
    pub stats: DistanceStats,
    pub discarded: Vec<DiscardedDay>,
}

pub struct SolarNoonSessionSelector<'a> {
    provider: &'a dyn SolarGeometryProvider,
    max_distance_minutes: f64,
    bands: Vec<f64>,
}

impl<'a> SolarNoonSessionSelector<'a> {
    pub fn new(
        provider: &'a dyn SolarGeometryProvider,
        max_distance_minutes: f64,
        bands: Vec<f64>,
    ) -> Self {
        Self {
            provider,
            max_distance_minutes,
            bands,
        }
    }

    /// Pick the representative window of every day.
    ///
    /// For each UTC calendar day present in `windows`, the window whose
    /// center is closest to solar noon is chosen (earliest start on ties).
    /// The day is kept only if that distance is within the configured
    /// maximum.
    ///
    /// # Arguments
    /// * `windows` - Window rows, any order
    ///
    /// # Returns
    /// Sessions ascending by date plus statistics over the accepted days
    pub fn select(&self, windows: &[WindowRow]) -> SessionSelection {
        let mut by_day: BTreeMap<NaiveDate, Vec<&WindowRow>> = BTreeMap::new();
        for row in windows {
            by_day.entry(utc_date(row.window_start)).or_default().push(row);
        }

        let mut sessions = Vec::with_capacity(by_day.len());
        let mut discarded = Vec::new();

        for (date, mut rows) in by_day {
            rows.sort_by_key(|r| r.window_start);
            let noon = self.provider.solar_noon(date);

            let mut best: Option<(&WindowRow, f64)> = None;
            for row in rows {
                let d = distance_minutes(row.window_center, noon);
                match best {
                    Some((_, best_d)) if d >= best_d => {}
                    _ => best = Some((row, d)),
                }
            }

            let Some((row, distance)) = best else {
                continue;
            };
            if distance <= self.max_distance_minutes {
                sessions.push(DailySession {
                    date,
                    window_start: row.window_start,
                    window_center: row.window_center,
                    solar_noon: noon,
                    distance_to_solar_noon_minutes: distance,
                    sample_count: row.sample_count,
                    channels: row.channels.clone(),
                });
            } else {
                debug!(
                    "Session: {} discarded, closest window {:.1} min from solar noon",
                    date, distance
                );
                discarded.push(DiscardedDay {
                    date,
                    distance_minutes: distance,
                });
            }
        }

        let distances: Vec<f64> = sessions
            .iter()
            .map(|s| s.distance_to_solar_noon_minutes)
            .collect();
        let stats = compute_distance_stats(&distances, &self.bands);

        info!(
            "Sessions: {} days accepted, {} discarded (max distance {} min)",
            sessions.len(),
            discarded.len(),
            self.max_distance_minutes
        );

        SessionSelection {
            sessions,
            stats,
            discarded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineResult;
    use crate::models::{Channels, TimePoint};
    use crate::solar::SolarPosition;
    use chrono::{Duration, TimeZone, Utc};

    /// Elevation peaking at a fixed time of day.
    struct Peak {
        hour: u32,
        minute: u32,
    }

    impl SolarGeometryProvider for Peak {
        fn position(&self, instants: &[TimePoint]) -> Vec<SolarPosition> {
            instants
                .iter()
                .map(|t| {
                    let noon = utc_date(*t)
                        .and_hms_opt(self.hour, self.minute, 0)
                        .unwrap()
                        .and_utc();
                    let elevation = 60.0 - distance_minutes(*t, noon) / 10.0;
                    SolarPosition {
                        zenith: 90.0 - elevation,
                        apparent_zenith: 90.0 - elevation,
                        elevation,
                        apparent_elevation: elevation,
                        azimuth: 0.0,
                    }
                })
                .collect()
        }

        fn poa(
            &self,
            _instants: &[TimePoint],
            ghi: &[f64],
            _dhi: &[f64],
            _dni: &[f64],
        ) -> PipelineResult<Vec<f64>> {
            Ok(ghi.to_vec())
        }

        fn clear_sky_ghi(&self, instants: &[TimePoint]) -> Vec<f64> {
            vec![1000.0; instants.len()]
        }
    }

    fn window(start: TimePoint) -> WindowRow {
        WindowRow {
            window_start: start,
            window_center: start + Duration::seconds(150),
            sample_count: 5,
            channels: Channels::new(),
        }
    }

    fn at(d: u32, h: u32, m: u32) -> TimePoint {
        Utc.with_ymd_and_hms(2024, 8, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_picks_window_closest_to_noon() {
        let provider = Peak { hour: 12, minute: 3 };
        let selector = SolarNoonSessionSelector::new(&provider, 45.0, vec![10.0]);
        let windows = vec![window(at(1, 11, 55)), window(at(1, 12, 0)), window(at(1, 12, 5))];
        let out = selector.select(&windows);
        assert_eq!(out.sessions.len(), 1);
        let s = &out.sessions[0];
        assert_eq!(s.window_center, at(1, 12, 0) + Duration::seconds(150));
        assert!((s.distance_to_solar_noon_minutes - 0.5).abs() < 1e-9);
        assert_eq!(s.solar_noon, at(1, 12, 3));
    }

    #[test]
    fn test_distance_gate() {
        // Only window centered 46 minutes before noon
        let provider = Peak { hour: 12, minute: 46 };
        let selector = SolarNoonSessionSelector::new(&provider, 45.0, vec![10.0]);
        let start = at(1, 11, 57) + Duration::seconds(30) - Duration::seconds(150);
        let out = selector.select(&[window(start)]);
        assert!(out.sessions.is_empty());
        assert_eq!(out.discarded.len(), 1);
        assert!((out.discarded[0].distance_minutes - 48.5).abs() < 1e-9);

        let selector = SolarNoonSessionSelector::new(&provider, 50.0, vec![10.0]);
        assert_eq!(selector.select(&[window(start)]).sessions.len(), 1);
    }

    #[test]
    fn test_gate_at_46_minutes() {
        let provider = Peak { hour: 12, minute: 0 };
        let selector = SolarNoonSessionSelector::new(&provider, 45.0, vec![]);
        // Center at 12:46 is 46 minutes after noon
        let start = at(1, 12, 46) - Duration::seconds(150);
        assert!(selector.select(&[window(start)]).sessions.is_empty());
        // Center at 12:45 is exactly on the limit
        let start = at(1, 12, 45) - Duration::seconds(150);
        assert_eq!(selector.select(&[window(start)]).sessions.len(), 1);
    }

    #[test]
    fn test_tie_prefers_earliest_window() {
        let provider = Peak { hour: 12, minute: 5 };
        let selector = SolarNoonSessionSelector::new(&provider, 45.0, vec![]);
        // Centers 12:02:30 and 12:07:30 are both 2.5 minutes from 12:05
        let windows = vec![window(at(1, 12, 5)), window(at(1, 12, 0))];
        let out = selector.select(&windows);
        assert_eq!(out.sessions[0].window_start, at(1, 12, 0));
    }

    #[test]
    fn test_one_session_per_day_ascending() {
        let provider = Peak { hour: 12, minute: 3 };
        let selector = SolarNoonSessionSelector::new(&provider, 45.0, vec![10.0, 45.0]);
        let windows = vec![
            window(at(3, 12, 0)),
            window(at(1, 12, 0)),
            window(at(1, 12, 5)),
            window(at(2, 12, 0)),
        ];
        let out = selector.select(&windows);
        let dates: Vec<u32> = out
            .sessions
            .iter()
            .map(|s| chrono::Datelike::day(&s.date))
            .collect();
        assert_eq!(dates, vec![1, 2, 3]);
        assert_eq!(out.stats.days, 3);
        assert_eq!(out.stats.bands[0].count, 3);
    }
}
