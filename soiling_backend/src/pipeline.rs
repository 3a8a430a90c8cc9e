//! Orchestration of the reference, session and module alignment stages.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::alignment::{
    AlignmentJob, DiscardedDay, ModuleAligner, ModuleAlignment, SolarNoonSessionSelector,
    WindowAggregator,
};
use crate::config::PipelineConfig;
use crate::error::{ErrorContext, PipelineResult};
use crate::filtering::{
    apply_channel_floors, retain_days, CurrentThresholdFilter, DayStability, ReferenceBuilder,
    StabilityGate, TemporalJoiner,
};
use crate::models::{
    DailySession, DistanceStats, IrradianceRecord, IrradianceSample, ModuleSample, ReferenceSet,
};
use crate::parsing::{normalize_irradiance, normalize_records, NormalizationReport, RawRecord};
use crate::solar::{NoaaSolarGeometry, SolarGeometryProvider};

/// Raw rows of every series, as decoded from the ingestion layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataset {
    pub irradiance: Vec<RawRecord>,
    pub primary: Vec<RawRecord>,
    #[serde(default)]
    pub modules: BTreeMap<String, Vec<RawRecord>>,
}

/// One secondary module's normalized series; `None` when absent.
#[derive(Debug, Clone)]
pub struct ModuleInput {
    pub name: String,
    pub samples: Option<Vec<ModuleSample>>,
}

/// Normalized, sorted series handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub irradiance: Vec<IrradianceSample>,
    pub primary: Vec<ModuleSample>,
    pub modules: Vec<ModuleInput>,
}

impl PipelineInputs {
    /// Normalize a raw dataset against the configuration.
    ///
    /// Every module declared in the configuration gets an entry; declared
    /// modules missing from the dataset are left absent. Undeclared series
    /// are ignored with a warning.
    ///
    /// # Returns
    /// The inputs plus one normalization report per series
    pub fn from_raw(
        config: &PipelineConfig,
        raw: &RawDataset,
    ) -> PipelineResult<(Self, BTreeMap<String, NormalizationReport>)> {
        let mut reports = BTreeMap::new();

        let (irradiance, report) = normalize_irradiance(&raw.irradiance, config.site_zone()?);
        reports.insert("irradiance".to_string(), report);

        let primary_zone = config.zone_for(config.primary.timezone.as_deref())?;
        let (primary, report) = normalize_records(&raw.primary, primary_zone, &config.primary.name);
        reports.insert(config.primary.name.clone(), report);

        let mut modules = Vec::with_capacity(config.modules.len());
        for spec in &config.modules {
            let samples = match raw.modules.get(&spec.name) {
                Some(records) => {
                    let zone = config.zone_for(spec.timezone.as_deref())?;
                    let (samples, report) = normalize_records(records, zone, &spec.name);
                    reports.insert(spec.name.clone(), report);
                    Some(samples)
                }
                None => None,
            };
            modules.push(ModuleInput {
                name: spec.name.clone(),
                samples,
            });
        }

        for name in raw.modules.keys() {
            if config.module(name).is_none() {
                warn!("Series '{}' has no module declaration, ignored", name);
            }
        }

        Ok((
            Self {
                irradiance,
                primary,
                modules,
            },
            reports,
        ))
    }
}

/// Samples entering and leaving the reference join for one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinCount {
    pub input: usize,
    pub kept: usize,
}

/// A module left out of the output and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedModule {
    pub module: String,
    pub reason: String,
}

/// Per-stage counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub irradiance_rows: usize,
    pub reference_rows: usize,
    pub joins: BTreeMap<String, JoinCount>,
    /// Rows removed by channel floors, for every series with floors declared.
    pub floor_drops: BTreeMap<String, usize>,
    /// Floor channels absent from a series, so not applied.
    pub floor_skipped_channels: BTreeMap<String, Vec<String>>,
    pub windows: usize,
    pub sessions_selected: usize,
    pub discarded_days: Vec<DiscardedDay>,
    pub current_filter_dropped: usize,
    pub current_filter_skipped_channels: Vec<String>,
    pub stability: Vec<DayStability>,
    pub stable_days: usize,
    pub skipped_modules: Vec<SkippedModule>,
}

impl RunReport {
    fn record_floors(&mut self, series: &str, dropped: usize, skipped: Vec<String>) {
        self.floor_drops.insert(series.to_string(), dropped);
        if !skipped.is_empty() {
            self.floor_skipped_channels.insert(series.to_string(), skipped);
        }
    }
}

/// All tables produced by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Accepted irradiance rows with derived columns.
    pub reference: Vec<IrradianceRecord>,
    pub reference_set: ReferenceSet,
    /// Primary module sessions on stable days.
    pub sessions: Vec<DailySession>,
    /// Statistics over every day accepted by the distance gate.
    pub distance_stats: DistanceStats,
    pub modules: BTreeMap<String, ModuleAlignment>,
    pub report: RunReport,
}

impl PipelineOutput {
    /// Days present in the final session table.
    pub fn session_days(&self) -> BTreeSet<NaiveDate> {
        self.sessions.iter().map(|s| s.date).collect()
    }
}

/// The full reference → sessions → alignment pipeline.
pub struct SoilingPipeline<P: SolarGeometryProvider> {
    config: PipelineConfig,
    provider: P,
}

impl SoilingPipeline<NoaaSolarGeometry> {
    /// Create a pipeline using the built-in NOAA ephemeris for the configured site.
    pub fn from_config(config: PipelineConfig) -> PipelineResult<Self> {
        let provider = NoaaSolarGeometry::new(
            config.site.clone(),
            config.panel.clone(),
            config.clear_sky.clone(),
        );
        Self::new(config, provider)
    }
}

impl<P: SolarGeometryProvider> SoilingPipeline<P> {
    /// Create a pipeline with a custom solar geometry provider.
    ///
    /// # Errors
    /// `Configuration` if the configuration does not validate.
    pub fn new(config: PipelineConfig, provider: P) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config, provider })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over the inputs.
    ///
    /// # Arguments
    /// * `inputs` - Normalized series, each sorted ascending
    ///
    /// # Returns
    /// Reference table, sessions, distance statistics and one aligned table
    /// per present module, all restricted to the same stable day set
    ///
    /// # Errors
    /// Only a failure of the irradiance or primary series aborts the run;
    /// module failures are recorded in the report.
    pub fn run(&self, inputs: &PipelineInputs) -> PipelineResult<PipelineOutput> {
        let config = &self.config;
        let thresholds = &config.thresholds;
        let provider: &dyn SolarGeometryProvider = &self.provider;
        let mut report = RunReport {
            irradiance_rows: inputs.irradiance.len(),
            ..Default::default()
        };

        // Step 1: Build the good-irradiance reference
        let reference =
            ReferenceBuilder::with_thresholds(provider, thresholds).build(&inputs.irradiance)?;
        report.reference_rows = reference.records.len();

        // Step 2: Join the primary and every module series against the reference
        let joiner = TemporalJoiner::new(thresholds.join_tolerance());
        let primary_name = config.primary.name.as_str();
        let primary = joiner
            .filter(&inputs.primary, &reference.set)
            .map_err(|e| e.with_context(ErrorContext::new("join").with_module(primary_name)))?;
        info!(
            "Join [{}]: {} -> {} rows",
            primary_name,
            inputs.primary.len(),
            primary.kept.len()
        );
        report.joins.insert(
            primary_name.to_string(),
            JoinCount {
                input: inputs.primary.len(),
                kept: primary.kept.len(),
            },
        );

        let mut joined: BTreeMap<&str, Vec<ModuleSample>> = BTreeMap::new();
        for module in &inputs.modules {
            let Some(samples) = module.samples.as_ref() else {
                continue;
            };
            match joiner.filter(samples, &reference.set) {
                Ok(outcome) => {
                    info!(
                        "Join [{}]: {} -> {} rows",
                        module.name,
                        samples.len(),
                        outcome.kept.len()
                    );
                    report.joins.insert(
                        module.name.clone(),
                        JoinCount {
                            input: samples.len(),
                            kept: outcome.kept.len(),
                        },
                    );
                    joined.insert(module.name.as_str(), outcome.kept);
                }
                Err(e) => {
                    warn!("Join [{}]: {}, module skipped", module.name, e);
                    report.skipped_modules.push(SkippedModule {
                        module: module.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Step 3: Apply declared channel floors
        let mut primary_rows = primary.kept;
        if !config.primary.channel_floors.is_empty() {
            let before = primary_rows.len();
            let outcome = apply_channel_floors(primary_rows, &config.primary.channel_floors);
            info!("Floors [{}]: {} -> {} rows", primary_name, before, outcome.kept.len());
            report.record_floors(primary_name, outcome.dropped, outcome.skipped_channels);
            primary_rows = outcome.kept;
        }
        for spec in &config.modules {
            if spec.channel_floors.is_empty() {
                continue;
            }
            if let Some(rows) = joined.remove(spec.name.as_str()) {
                let before = rows.len();
                let outcome = apply_channel_floors(rows, &spec.channel_floors);
                info!("Floors [{}]: {} -> {} rows", spec.name, before, outcome.kept.len());
                report.record_floors(&spec.name, outcome.dropped, outcome.skipped_channels);
                joined.insert(spec.name.as_str(), outcome.kept);
            }
        }

        // Step 4: Window the primary series and select one session per day
        let windows = WindowAggregator::new(thresholds.window()).aggregate(&primary_rows);
        report.windows = windows.len();
        let selection = SolarNoonSessionSelector::new(
            provider,
            thresholds.max_solar_noon_distance_minutes,
            config.distance_bands_minutes.clone(),
        )
        .select(&windows);
        report.sessions_selected = selection.sessions.len();
        report.discarded_days = selection.discarded;

        // Step 5: Current guard on the sessions
        let current = CurrentThresholdFilter::new(
            thresholds.current_minimum_amps,
            config.primary.current_channels.clone(),
        )
        .filter_by_current(&selection.sessions);
        info!(
            "Current filter: {} -> {} sessions (>= {} A)",
            selection.sessions.len(),
            current.kept.len(),
            thresholds.current_minimum_amps
        );
        report.current_filter_dropped = current.dropped;
        report.current_filter_skipped_channels = current.skipped_channels;

        // Step 6: Stability gate over the session windows
        let gate = StabilityGate::from_thresholds(thresholds, &config.stability);
        report.stability = gate.evaluate(&current.kept, &reference.records);
        let stable: BTreeSet<NaiveDate> = report
            .stability
            .iter()
            .filter(|d| d.verdict.is_stable())
            .map(|d| d.date)
            .collect();
        report.stable_days = stable.len();
        info!(
            "Stability: {} -> {} days",
            current.kept.len(),
            stable.len()
        );
        let sessions = retain_days(current.kept, &stable, |s| s.date);

        // Step 7: Align the modules in parallel
        for name in joined.keys() {
            if config.module(name).is_none() {
                warn!("Align [{}]: no alignment class declared, module skipped", name);
            }
        }
        let failed: BTreeSet<&str> = report
            .skipped_modules
            .iter()
            .map(|s| s.module.as_str())
            .collect();
        let jobs: Vec<AlignmentJob<'_>> = config
            .modules
            .iter()
            .filter(|spec| !failed.contains(spec.name.as_str()))
            .map(|spec| AlignmentJob {
                module: spec.name.as_str(),
                class: spec.alignment,
                samples: joined.get(spec.name.as_str()).map(Vec::as_slice),
            })
            .collect();
        let aligner = ModuleAligner::from_thresholds(thresholds);
        let results = aligner.align_all(&jobs, &sessions);

        // Step 8: Restrict every module table to the stable day set
        let mut modules = BTreeMap::new();
        for (name, result) in results {
            match result {
                Ok(mut alignment) => {
                    alignment.rows = retain_days(alignment.rows, &stable, |r| r.date);
                    modules.insert(name, alignment);
                }
                Err(e) => {
                    report.skipped_modules.push(SkippedModule {
                        module: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Pipeline: {} reference rows, {} sessions, {} modules aligned, {} skipped",
            report.reference_rows,
            sessions.len(),
            modules.len(),
            report.skipped_modules.len()
        );

        Ok(PipelineOutput {
            reference: reference.records,
            reference_set: reference.set,
            sessions,
            distance_stats: selection.stats,
            modules,
            report,
        })
    }
}
