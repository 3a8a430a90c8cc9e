//! Alignment of secondary sensor modules onto the daily sessions.
//!
//! How a module is aligned depends only on its declared sampling class:
//!
//! | class              | rule                                                         |
//! |--------------------|--------------------------------------------------------------|
//! | `high_frequency`   | mean of samples in `[window_start, window_start + width)`    |
//! | `medium_frequency` | nearest sample to the window center on the same day          |
//! | `irregular`        | nearest sample to the window center, within a maximum        |
//!
//! Modules logging several physical units on one clock are aligned per
//! group, giving one row per day per group. Nearest-sample ties go to the
//! earlier sample.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::time::{distance_minutes, is_non_decreasing, minutes, start_of_day};
use crate::models::{channel_means, AlignedRow, DailySession, ModuleSample, TimePoint};

/// Declared sampling-frequency class of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentClass {
    /// About one sample per minute.
    HighFrequency,
    /// About one sample per five minutes.
    MediumFrequency,
    /// Unevenly sampled.
    Irregular,
}

impl AlignmentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighFrequency => "high_frequency",
            Self::MediumFrequency => "medium_frequency",
            Self::Irregular => "irregular",
        }
    }
}

/// Aligned table of one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleAlignment {
    pub module: String,
    pub class: AlignmentClass,
    /// Ascending by date, then group.
    pub rows: Vec<AlignedRow>,
    /// Session days for which no group produced a row.
    pub missing_days: Vec<NaiveDate>,
}

impl ModuleAlignment {
    /// Distinct days present in the table.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.rows.iter().map(|r| r.date).collect();
        dates.dedup();
        dates
    }
}

/// One module handed to [`ModuleAligner::align_all`].
#[derive(Debug, Clone, Copy)]
pub struct AlignmentJob<'a> {
    pub module: &'a str,
    pub class: AlignmentClass,
    /// `None` when the module's input series is absent.
    pub samples: Option<&'a [ModuleSample]>,
}

#[derive(Debug, Clone)]
pub struct ModuleAligner {
    window: Duration,
    medium_max_distance_minutes: Option<f64>,
    irregular_max_distance_minutes: f64,
}

impl ModuleAligner {
    pub fn new(
        window: Duration,
        medium_max_distance_minutes: Option<f64>,
        irregular_max_distance_minutes: f64,
    ) -> Self {
        Self {
            window,
            medium_max_distance_minutes,
            irregular_max_distance_minutes,
        }
    }

    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        Self::new(
            minutes(thresholds.window_minutes),
            thresholds.medium_max_distance_minutes,
            thresholds.irregular_max_distance_minutes,
        )
    }

    /// Align one module to the sessions.
    ///
    /// # Arguments
    /// * `module` - Module name, carried into the output
    /// * `samples` - Module series, ascending by timestamp
    /// * `sessions` - Daily sessions, ascending by date
    /// * `class` - Sampling class selecting the alignment rule
    ///
    /// # Errors
    /// `UnsortedSeries` if `samples` is not ascending.
    pub fn align(
        &self,
        module: &str,
        samples: &[ModuleSample],
        sessions: &[DailySession],
        class: AlignmentClass,
    ) -> PipelineResult<ModuleAlignment> {
        if !is_non_decreasing(samples.iter().map(|s| s.timestamp)) {
            return Err(PipelineError::unsorted("module series must be sorted ascending")
                .with_context(ErrorContext::new("align").with_module(module)));
        }

        let mut groups: BTreeMap<Option<&str>, Vec<&ModuleSample>> = BTreeMap::new();
        for sample in samples {
            groups.entry(sample.group.as_deref()).or_default().push(sample);
        }

        let mut rows = Vec::new();
        let mut missing_days = Vec::new();
        for session in sessions {
            let before = rows.len();
            for (group, series) in &groups {
                let row = match class {
                    AlignmentClass::HighFrequency => self.window_mean(series, session),
                    AlignmentClass::MediumFrequency => self.nearest_same_day(series, session),
                    AlignmentClass::Irregular => self.nearest_within(series, session),
                };
                if let Some(mut row) = row {
                    row.group = group.map(str::to_string);
                    rows.push(row);
                }
            }
            if rows.len() == before {
                missing_days.push(session.date);
            }
        }

        info!(
            "Align [{}] ({}): {} rows over {} sessions, {} days without data",
            module,
            class.as_str(),
            rows.len(),
            sessions.len(),
            missing_days.len()
        );

        Ok(ModuleAlignment {
            module: module.to_string(),
            class,
            rows,
            missing_days,
        })
    }

    /// Align several modules concurrently.
    ///
    /// Each module is independent; a module whose series is absent or
    /// invalid yields an error in its own slot without affecting the others.
    /// Results keep the order of `jobs`.
    pub fn align_all(
        &self,
        jobs: &[AlignmentJob<'_>],
        sessions: &[DailySession],
    ) -> Vec<(String, PipelineResult<ModuleAlignment>)> {
        jobs.par_iter()
            .map(|job| {
                let result = match job.samples {
                    Some(samples) => self.align(job.module, samples, sessions, job.class),
                    None => {
                        warn!("Align [{}]: input series absent, module skipped", job.module);
                        Err(PipelineError::missing_module(job.module))
                    }
                };
                (job.module.to_string(), result)
            })
            .collect()
    }

    fn window_mean(&self, series: &[&ModuleSample], session: &DailySession) -> Option<AlignedRow> {
        let end = session.window_start + self.window;
        let lo = series.partition_point(|s| s.timestamp < session.window_start);
        let hi = series.partition_point(|s| s.timestamp < end);
        if hi <= lo {
            return None;
        }
        let members = &series[lo..hi];
        Some(AlignedRow {
            date: session.date,
            timestamp: session.window_center,
            group: None,
            channels: channel_means(members.iter().map(|s| &s.channels)),
            distance_minutes: None,
            sample_count: members.len(),
        })
    }

    fn nearest_same_day(
        &self,
        series: &[&ModuleSample],
        session: &DailySession,
    ) -> Option<AlignedRow> {
        let day_start = start_of_day(session.date);
        let day_end = day_start + Duration::days(1);
        let lo = series.partition_point(|s| s.timestamp < day_start);
        let hi = series.partition_point(|s| s.timestamp < day_end);
        if hi <= lo {
            return None;
        }
        let idx = lo + nearest_index(&series[lo..hi], session.window_center)?;
        let row = chosen_row(series[idx], session);
        match (self.medium_max_distance_minutes, row.distance_minutes) {
            (Some(limit), Some(d)) if d > limit => None,
            _ => Some(row),
        }
    }

    fn nearest_within(
        &self,
        series: &[&ModuleSample],
        session: &DailySession,
    ) -> Option<AlignedRow> {
        let idx = nearest_index(series, session.window_center)?;
        let row = chosen_row(series[idx], session);
        match row.distance_minutes {
            Some(d) if d <= self.irregular_max_distance_minutes => Some(row),
            _ => None,
        }
    }
}

/// Index of the sample nearest to `target`; the earlier one wins ties.
fn nearest_index(series: &[&ModuleSample], target: TimePoint) -> Option<usize> {
    if series.is_empty() {
        return None;
    }
    let after = series.partition_point(|s| s.timestamp < target);
    if after == 0 {
        return Some(0);
    }
    if after == series.len() {
        return Some(series.len() - 1);
    }
    let before = after - 1;
    let d_before = target - series[before].timestamp;
    let d_after = series[after].timestamp - target;
    Some(if d_after < d_before { after } else { before })
}

fn chosen_row(sample: &ModuleSample, session: &DailySession) -> AlignedRow {
    AlignedRow {
        date: session.date,
        timestamp: sample.timestamp,
        group: None,
        channels: sample.channels.clone(),
        distance_minutes: Some(distance_minutes(sample.timestamp, session.window_center)),
        sample_count: 1,
    }
}
