//! Construction of the "good irradiance" reference set.

use log::info;

use crate::config::Thresholds;
use crate::error::{ErrorContext, PipelineResult};
use crate::models::{IrradianceRecord, IrradianceSample, ReferenceSet, TimePoint};
use crate::solar::SolarGeometryProvider;

/// Result of building the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceOutput {
    /// Accepted rows with their derived columns, ascending by timestamp.
    pub records: Vec<IrradianceRecord>,
    pub set: ReferenceSet,
    /// Rows evaluated before the acceptance test.
    pub evaluated: usize,
}

/// Derives POA and clear-sky columns and keeps rows passing both thresholds.
pub struct ReferenceBuilder<'a> {
    provider: &'a dyn SolarGeometryProvider,
    poa_minimum: f64,
    clear_sky_ratio_minimum: f64,
}

impl<'a> ReferenceBuilder<'a> {
    pub fn new(
        provider: &'a dyn SolarGeometryProvider,
        poa_minimum: f64,
        clear_sky_ratio_minimum: f64,
    ) -> Self {
        Self {
            provider,
            poa_minimum,
            clear_sky_ratio_minimum,
        }
    }

    /// Create a builder using the configured thresholds.
    pub fn with_thresholds(provider: &'a dyn SolarGeometryProvider, thresholds: &Thresholds) -> Self {
        Self::new(
            provider,
            thresholds.poa_minimum,
            thresholds.clear_sky_ratio_minimum,
        )
    }

    /// Attach POA, clear-sky GHI and clear-sky ratio to every sample.
    pub fn derive(&self, samples: &[IrradianceSample]) -> PipelineResult<Vec<IrradianceRecord>> {
        let instants: Vec<TimePoint> = samples.iter().map(|s| s.timestamp).collect();
        let ghi: Vec<f64> = samples.iter().map(|s| s.ghi).collect();
        let dhi: Vec<f64> = samples.iter().map(|s| s.dhi).collect();
        let dni: Vec<f64> = samples.iter().map(|s| s.dni).collect();

        let poa = self
            .provider
            .poa(&instants, &ghi, &dhi, &dni)
            .map_err(|e| e.with_context(ErrorContext::new("reference")))?;
        let clear_sky = self.provider.clear_sky_ghi(&instants);

        Ok(samples
            .iter()
            .zip(poa.iter().zip(clear_sky.iter()))
            .map(|(sample, (poa, cs))| IrradianceRecord::derive(sample, *poa, *cs))
            .collect())
    }

    /// Acceptance test: `POA ≥ poa_minimum` AND `clear_sky_ratio ≥ clear_sky_ratio_minimum`.
    ///
    /// An undefined ratio always fails.
    pub fn accepts(&self, record: &IrradianceRecord) -> bool {
        let poa_ok = record.poa >= self.poa_minimum;
        let ratio_ok = record
            .clear_sky_ratio
            .map_or(false, |r| r >= self.clear_sky_ratio_minimum);
        poa_ok && ratio_ok
    }

    /// Build the reference from raw samples.
    ///
    /// # Arguments
    /// * `samples` - Irradiance series, ascending by timestamp
    ///
    /// # Returns
    /// Accepted records and the deduplicated, sorted reference instants
    pub fn build(&self, samples: &[IrradianceSample]) -> PipelineResult<ReferenceOutput> {
        let records = self.derive(samples)?;
        Ok(self.select(records))
    }

    /// Apply the acceptance test to already-derived records.
    pub fn select(&self, records: Vec<IrradianceRecord>) -> ReferenceOutput {
        let evaluated = records.len();
        let mut accepted: Vec<IrradianceRecord> =
            records.into_iter().filter(|r| self.accepts(r)).collect();
        accepted.sort_by_key(|r| r.timestamp);
        accepted.dedup_by_key(|r| r.timestamp);

        let set = ReferenceSet::from_instants(accepted.iter().map(|r| r.timestamp));
        info!(
            "Reference: {} -> {} rows (POA >= {}, clear-sky ratio >= {})",
            evaluated,
            accepted.len(),
            self.poa_minimum,
            self.clear_sky_ratio_minimum
        );

        ReferenceOutput {
            records: accepted,
            set,
            evaluated,
        }
    }
}
