//! Conversion of raw tabular rows into sorted, UTC-normalized series.

use std::collections::BTreeMap;

use chrono_tz::Tz;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::timestamps::parse_timestamp;
use crate::models::{Channels, IrradianceSample, ModuleSample};

/// One row as handed over by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub channels: BTreeMap<String, Option<f64>>,
}

impl RawRecord {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            group: None,
            channels: BTreeMap::new(),
        }
    }

    pub fn with_channel(mut self, name: impl Into<String>, value: f64) -> Self {
        self.channels.insert(name.into(), Some(value));
        self
    }
}

/// Row-level outcome of normalizing one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub total: usize,
    pub accepted: usize,
    pub malformed_timestamps: usize,
    pub duplicates: usize,
    /// Irradiance rows lacking GHI, DHI or DNI.
    pub incomplete: usize,
    /// Individual values turned into missing because they were NaN/inf.
    pub non_finite_values: usize,
}

/// Parse, sort and deduplicate a module's rows.
///
/// Rows whose timestamp cannot be normalized are dropped and counted. Among
/// rows sharing the same instant and group only the first is kept.
///
/// # Arguments
/// * `records` - Raw rows in any order
/// * `zone` - Zone for naive timestamps
/// * `module` - Module name used in log messages
pub fn normalize_records(
    records: &[RawRecord],
    zone: Tz,
    module: &str,
) -> (Vec<ModuleSample>, NormalizationReport) {
    let mut report = NormalizationReport {
        total: records.len(),
        ..Default::default()
    };

    let mut samples = Vec::with_capacity(records.len());
    for record in records {
        let timestamp = match parse_timestamp(&record.timestamp, zone) {
            Ok(t) => t,
            Err(e) => {
                report.malformed_timestamps += 1;
                debug!("[{}] dropping row: {}", module, e);
                continue;
            }
        };

        let mut channels = Channels::new();
        for (name, value) in &record.channels {
            let value = match value {
                Some(v) if !v.is_finite() => {
                    report.non_finite_values += 1;
                    None
                }
                other => *other,
            };
            channels.insert(name.clone(), value);
        }

        samples.push(ModuleSample {
            timestamp,
            group: record.group.clone(),
            channels,
        });
    }

    // Stable sort keeps the first occurrence of a duplicate in front
    samples.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.group.cmp(&b.group))
    });
    let before = samples.len();
    samples.dedup_by(|later, earlier| {
        later.timestamp == earlier.timestamp && later.group == earlier.group
    });
    report.duplicates = before - samples.len();
    report.accepted = samples.len();

    log_report(module, &report);
    (samples, report)
}

/// Parse, sort and deduplicate irradiance rows.
///
/// Rows must carry `GHI`, `DHI` and `DNI`; rows missing any of them are
/// counted as incomplete and dropped.
pub fn normalize_irradiance(
    records: &[RawRecord],
    zone: Tz,
) -> (Vec<IrradianceSample>, NormalizationReport) {
    let (samples, mut report) = normalize_records(records, zone, "irradiance");

    let irradiance: Vec<IrradianceSample> = samples
        .iter()
        .filter_map(|s| {
            let ghi = s.channels.get("GHI").copied().flatten()?;
            let dhi = s.channels.get("DHI").copied().flatten()?;
            let dni = s.channels.get("DNI").copied().flatten()?;
            Some(IrradianceSample::new(s.timestamp, ghi, dhi, dni))
        })
        .collect();

    report.incomplete = samples.len() - irradiance.len();
    report.accepted = irradiance.len();
    if report.incomplete > 0 {
        warn!(
            "[irradiance] {} rows without GHI/DHI/DNI dropped",
            report.incomplete
        );
    }
    (irradiance, report)
}

fn log_report(module: &str, report: &NormalizationReport) {
    if report.malformed_timestamps > 0 {
        warn!(
            "[{}] {} of {} rows dropped for malformed timestamps",
            module, report.malformed_timestamps, report.total
        );
    }
    if report.duplicates > 0 {
        warn!(
            "[{}] {} duplicate rows dropped (same instant and group)",
            module, report.duplicates
        );
    }
    if report.non_finite_values > 0 {
        warn!(
            "[{}] {} non-finite values treated as missing",
            module, report.non_finite_values
        );
    }
}
