#![allow(dead_code)]

use chrono::{Duration, NaiveDate, TimeZone, Utc};

use soiling_rust::config::{PanelGeometry, SiteConfig};
use soiling_rust::models::time::{distance_minutes, utc_date};
use soiling_rust::models::{IrradianceSample, ModuleSample, TimePoint};
use soiling_rust::solar::{SolarGeometryProvider, SolarPosition};
use soiling_rust::PipelineResult;

/// Solar geometry with a fixed noon each day, POA equal to GHI and a
/// constant clear-sky GHI.
pub struct SyntheticSun {
    pub noon_hour: u32,
    pub noon_minute: u32,
    pub clear_sky: f64,
}

impl SyntheticSun {
    pub fn new(noon_hour: u32, noon_minute: u32) -> Self {
        Self {
            noon_hour,
            noon_minute,
            clear_sky: 1000.0,
        }
    }

    fn noon_of(&self, t: TimePoint) -> TimePoint {
        utc_date(t)
            .and_hms_opt(self.noon_hour, self.noon_minute, 0)
            .expect("valid noon")
            .and_utc()
    }
}

impl SolarGeometryProvider for SyntheticSun {
    fn position(&self, instants: &[TimePoint]) -> Vec<SolarPosition> {
        instants
            .iter()
            .map(|t| {
                let elevation = 70.0 - distance_minutes(*t, self.noon_of(*t)) / 8.0;
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
        vec![self.clear_sky; instants.len()]
    }
}

pub fn site() -> SiteConfig {
    SiteConfig {
        latitude: -24.08992287800815,
        longitude: -69.92873664034512,
        altitude: 500.0,
        timezone: "UTC".to_string(),
    }
}

pub fn panel() -> PanelGeometry {
    PanelGeometry {
        tilt: 20.0,
        azimuth: 0.0,
        albedo: 0.25,
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, d).expect("valid day")
}

pub fn at(d: u32, h: u32, m: u32) -> TimePoint {
    Utc.with_ymd_and_hms(2024, 8, d, h, m, 0).unwrap()
}

/// Instants every `step` minutes in `[from, to)`.
pub fn every(from: TimePoint, to: TimePoint, step: i64) -> Vec<TimePoint> {
    let mut out = Vec::new();
    let mut t = from;
    while t < to {
        out.push(t);
        t += Duration::minutes(step);
    }
    out
}

/// One-minute irradiance between 10:00 and 14:00 with GHI from `ghi(minute_index)`.
pub fn irradiance_day<F>(d: u32, ghi: F) -> Vec<IrradianceSample>
where
    F: Fn(usize) -> f64,
{
    every(at(d, 10, 0), at(d, 14, 0), 1)
        .into_iter()
        .enumerate()
        .map(|(i, t)| IrradianceSample::new(t, ghi(i), 80.0, 900.0))
        .collect()
}

/// Module series with one constant-valued channel.
pub fn constant_series(instants: &[TimePoint], channel: &str, value: f64) -> Vec<ModuleSample> {
    instants
        .iter()
        .map(|t| ModuleSample::new(*t).with_channel(channel, value))
        .collect()
}
