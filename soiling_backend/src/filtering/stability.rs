//! Irradiance stability gate over session windows.
//!
//! A day is stable when the reference irradiance inside its session window
//! satisfies `(G_max - G_min) / G_mean < max_relative_spread`. Days are also
//! rejected for a non-positive mean or for missing reference coverage; the
//! gate is applied to every module so all outputs share one day set.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{StabilityChannel, StabilityConfig, Thresholds};
use crate::models::{AlignedRow, ChannelRecord, DailySession, IrradianceRecord, TimePoint};

/// Outcome of the stability test for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum StabilityVerdict {
    Stable { ratio: f64 },
    Unstable { ratio: f64 },
    NonPositiveMean,
    NoCoverage { samples: usize },
}

impl StabilityVerdict {
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Stable { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStability {
    pub date: NaiveDate,
    pub verdict: StabilityVerdict,
}

/// `(max - min) / mean` of the finite values, `None` if there are none.
pub fn relative_spread(values: &[f64]) -> Option<(f64, f64)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    Some(((max - min) / mean, mean))
}

pub struct StabilityGate {
    max_relative_spread: f64,
    min_samples: usize,
    channel: StabilityChannel,
}

impl StabilityGate {
    pub fn new(max_relative_spread: f64) -> Self {
        Self::with_config(max_relative_spread, &StabilityConfig::default())
    }

    pub fn with_config(max_relative_spread: f64, config: &StabilityConfig) -> Self {
        Self {
            max_relative_spread,
            min_samples: config.min_samples,
            channel: config.channel,
        }
    }

    pub fn from_thresholds(thresholds: &Thresholds, config: &StabilityConfig) -> Self {
        Self::with_config(thresholds.stability_max_relative_spread, config)
    }

    fn channel_name(&self) -> &'static str {
        match self.channel {
            StabilityChannel::Poa => "POA",
            StabilityChannel::Ghi => "GHI",
        }
    }

    /// Judge the reference values falling in `[start, end)`.
    ///
    /// `reference` must be sorted ascending by timestamp.
    pub fn evaluate_window(
        &self,
        reference: &[IrradianceRecord],
        start: TimePoint,
        end: TimePoint,
    ) -> StabilityVerdict {
        let lo = reference.partition_point(|r| r.timestamp < start);
        let hi = reference.partition_point(|r| r.timestamp < end);
        let name = self.channel_name();
        let values: Vec<f64> = reference[lo..hi.max(lo)]
            .iter()
            .filter_map(|r| r.channel(name))
            .filter(|v| v.is_finite())
            .collect();

        if values.len() < self.min_samples.max(1) {
            return StabilityVerdict::NoCoverage {
                samples: values.len(),
            };
        }
        match relative_spread(&values) {
            None => StabilityVerdict::NoCoverage { samples: 0 },
            Some((_, mean)) if mean <= 0.0 => StabilityVerdict::NonPositiveMean,
            Some((ratio, _)) if ratio < self.max_relative_spread => {
                StabilityVerdict::Stable { ratio }
            }
            Some((ratio, _)) => StabilityVerdict::Unstable { ratio },
        }
    }

    /// Verdict for every session day.
    pub fn evaluate(
        &self,
        sessions: &[DailySession],
        reference: &[IrradianceRecord],
    ) -> Vec<DayStability> {
        sessions
            .iter()
            .map(|s| {
                let verdict = self.evaluate_window(reference, s.window_start, s.window_end());
                if !verdict.is_stable() {
                    debug!("Stability: {} rejected ({:?})", s.date, verdict);
                }
                DayStability {
                    date: s.date,
                    verdict,
                }
            })
            .collect()
    }

    /// Days passing the gate.
    pub fn stable_days(
        &self,
        sessions: &[DailySession],
        reference: &[IrradianceRecord],
    ) -> BTreeSet<NaiveDate> {
        let verdicts = self.evaluate(sessions, reference);
        let stable: BTreeSet<NaiveDate> = verdicts
            .iter()
            .filter(|d| d.verdict.is_stable())
            .map(|d| d.date)
            .collect();
        info!(
            "Stability: {} of {} session days stable (spread < {})",
            stable.len(),
            verdicts.len(),
            self.max_relative_spread
        );
        stable
    }

    /// Drop aligned rows of days failing the gate.
    pub fn filter_stable_days(
        &self,
        rows: Vec<AlignedRow>,
        sessions: &[DailySession],
        reference: &[IrradianceRecord],
    ) -> Vec<AlignedRow> {
        let stable = self.stable_days(sessions, reference);
        retain_days(rows, &stable, |r| r.date)
    }
}

/// Keep rows whose day is in `days`.
pub fn retain_days<T, F>(rows: Vec<T>, days: &BTreeSet<NaiveDate>, date_of: F) -> Vec<T>
where
    F: Fn(&T) -> NaiveDate,
{
    rows.into_iter().filter(|r| days.contains(&date_of(r))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channels, IrradianceSample};
    use chrono::{Duration, TimeZone, Utc};

    fn start() -> TimePoint {
        Utc.with_ymd_and_hms(2024, 8, 1, 16, 45, 0).unwrap()
    }

    fn reference(poas: &[f64]) -> Vec<IrradianceRecord> {
        poas.iter()
            .enumerate()
            .map(|(i, p)| {
                let sample = IrradianceSample::new(
                    start() + Duration::minutes(i as i64),
                    900.0,
                    80.0,
                    950.0,
                );
                IrradianceRecord::derive(&sample, *p, 1000.0)
            })
            .collect()
    }

    fn session() -> DailySession {
        DailySession {
            date: start().date_naive(),
            window_start: start(),
            window_center: start() + Duration::seconds(150),
            solar_noon: start() + Duration::minutes(2),
            distance_to_solar_noon_minutes: 0.5,
            sample_count: 5,
            channels: Channels::new(),
        }
    }

    fn verdict(poas: &[f64]) -> StabilityVerdict {
        StabilityGate::new(0.10).evaluate_window(
            &reference(poas),
            start(),
            start() + Duration::minutes(5),
        )
    }

    #[test]
    fn test_boundary_099_kept() {
        assert!(verdict(&[950.5, 1049.5]).is_stable());
    }

    #[test]
    fn test_boundary_101_dropped() {
        assert!(matches!(
            verdict(&[949.5, 1050.5]),
            StabilityVerdict::Unstable { .. }
        ));
    }

    #[test]
    fn test_exact_threshold_dropped() {
        assert!(!verdict(&[950.0, 1050.0]).is_stable());
    }

    #[test]
    fn test_zero_mean_dropped() {
        assert_eq!(verdict(&[0.0, 0.0]), StabilityVerdict::NonPositiveMean);
    }

    #[test]
    fn test_no_coverage_dropped() {
        assert_eq!(verdict(&[]), StabilityVerdict::NoCoverage { samples: 0 });
        assert_eq!(verdict(&[1000.0]), StabilityVerdict::NoCoverage { samples: 1 });
    }

    #[test]
    fn test_window_end_is_exclusive() {
        // Samples at minutes 0..=5; the one at minute 5 is outside and would break stability
        let v = verdict(&[1000.0, 1000.0, 1000.0, 1000.0, 1000.0, 2000.0]);
        assert_eq!(v, StabilityVerdict::Stable { ratio: 0.0 });
    }

    #[test]
    fn test_filter_stable_days() {
        let gate = StabilityGate::new(0.10);
        let stable_ref = reference(&[1000.0, 1010.0, 990.0]);
        let row = AlignedRow {
            date: start().date_naive(),
            timestamp: start(),
            group: None,
            channels: Channels::new(),
            distance_minutes: None,
            sample_count: 1,
        };
        let kept = gate.filter_stable_days(vec![row.clone()], &[session()], &stable_ref);
        assert_eq!(kept.len(), 1);

        let unstable_ref = reference(&[600.0, 1000.0, 1400.0]);
        let kept = gate.filter_stable_days(vec![row], &[session()], &unstable_ref);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_ghi_channel_option() {
        let config = StabilityConfig {
            channel: StabilityChannel::Ghi,
            min_samples: 2,
        };
        let gate = StabilityGate::with_config(0.10, &config);
        // POA unstable but GHI constant at 900
        let v = gate.evaluate_window(
            &reference(&[500.0, 1500.0]),
            start(),
            start() + Duration::minutes(5),
        );
        assert!(v.is_stable());
    }
}
