//! Irradiance measurements and the accepted reference timeline.

use serde::{Deserialize, Serialize};

use super::series::{ChannelRecord, Timestamped};
use super::time::TimePoint;

/// Clear-sky GHI at or below this value leaves the clear-sky ratio undefined.
pub const CLEAR_SKY_EPSILON: f64 = 1e-6;

/// One measured irradiance row (W/m²).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrradianceSample {
    pub timestamp: TimePoint,
    pub ghi: f64,
    pub dhi: f64,
    pub dni: f64,
}

impl IrradianceSample {
    pub fn new(timestamp: TimePoint, ghi: f64, dhi: f64, dni: f64) -> Self {
        Self {
            timestamp,
            ghi,
            dhi,
            dni,
        }
    }
}

impl Timestamped for IrradianceSample {
    fn timestamp(&self) -> TimePoint {
        self.timestamp
    }
}

/// Irradiance row with the columns derived from solar geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrradianceRecord {
    pub timestamp: TimePoint,
    pub ghi: f64,
    pub dhi: f64,
    pub dni: f64,
    pub poa: f64,
    pub ghi_clear_sky: f64,
    /// `None` when the clear-sky GHI is too small to divide by.
    pub clear_sky_ratio: Option<f64>,
}

impl IrradianceRecord {
    /// Attach derived columns to a measured sample.
    pub fn derive(sample: &IrradianceSample, poa: f64, ghi_clear_sky: f64) -> Self {
        Self {
            timestamp: sample.timestamp,
            ghi: sample.ghi,
            dhi: sample.dhi,
            dni: sample.dni,
            poa,
            ghi_clear_sky,
            clear_sky_ratio: clear_sky_ratio(sample.ghi, ghi_clear_sky),
        }
    }
}

impl Timestamped for IrradianceRecord {
    fn timestamp(&self) -> TimePoint {
        self.timestamp
    }
}

impl ChannelRecord for IrradianceRecord {
    fn channel(&self, name: &str) -> Option<f64> {
        match name {
            "GHI" => Some(self.ghi),
            "DHI" => Some(self.dhi),
            "DNI" => Some(self.dni),
            "POA" => Some(self.poa),
            "GHI_clear_sky" => Some(self.ghi_clear_sky),
            "clear_sky_ratio" => self.clear_sky_ratio,
            _ => None,
        }
    }
}

/// Measured GHI over clear-sky GHI, undefined near zero clear-sky irradiance.
pub fn clear_sky_ratio(ghi: f64, ghi_clear_sky: f64) -> Option<f64> {
    if ghi_clear_sky > CLEAR_SKY_EPSILON && ghi.is_finite() {
        Some(ghi / ghi_clear_sky)
    } else {
        None
    }
}

/// Accepted "good irradiance" instants, strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSet {
    instants: Vec<TimePoint>,
}

impl ReferenceSet {
    /// Build from arbitrary instants; sorts and removes duplicates.
    pub fn from_instants<I>(instants: I) -> Self
    where
        I: IntoIterator<Item = TimePoint>,
    {
        let mut instants: Vec<TimePoint> = instants.into_iter().collect();
        instants.sort_unstable();
        instants.dedup();
        Self { instants }
    }

    pub fn instants(&self) -> &[TimePoint] {
        &self.instants
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    pub fn contains(&self, t: TimePoint) -> bool {
        self.instants.binary_search(&t).is_ok()
    }
}
