//! The solar geometry capability and its default implementation.

use chrono::{Duration, NaiveDate};

use super::clearsky::{haurwitz_ghi, ineichen_ghi};
use super::irradiance::{cos_angle_of_incidence, extraterrestrial_irradiance, poa_isotropic};
use super::position::{solar_position, SolarPosition};
use crate::config::{ClearSkyModel, PanelGeometry, SiteConfig};
use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::time::start_of_day;
use crate::models::TimePoint;

/// Solar position, transposition and clear-sky irradiance for a fixed site.
///
/// Implementations are pure functions of the site and time; the site and
/// panel geometry are fixed at construction.
pub trait SolarGeometryProvider: Send + Sync {
    /// Sun position for each instant.
    fn position(&self, instants: &[TimePoint]) -> Vec<SolarPosition>;

    /// Plane-of-array irradiance for each instant.
    ///
    /// # Errors
    /// `Parse` if the component slices do not match `instants` in length.
    fn poa(
        &self,
        instants: &[TimePoint],
        ghi: &[f64],
        dhi: &[f64],
        dni: &[f64],
    ) -> PipelineResult<Vec<f64>>;

    /// Clear-sky GHI for each instant.
    fn clear_sky_ghi(&self, instants: &[TimePoint]) -> Vec<f64>;

    /// Instant of maximum elevation on a UTC calendar day.
    ///
    /// Samples the day at one-minute resolution; the first sample reaching
    /// the maximum wins.
    fn solar_noon(&self, date: NaiveDate) -> TimePoint {
        let midnight = start_of_day(date);
        let instants: Vec<TimePoint> = (0..1440)
            .map(|m| midnight + Duration::minutes(m))
            .collect();
        let positions = self.position(&instants);

        let mut best = 0;
        for (i, pos) in positions.iter().enumerate() {
            if pos.elevation > positions[best].elevation {
                best = i;
            }
        }
        instants[best]
    }
}

/// NOAA ephemeris with isotropic transposition and a configurable clear-sky model.
#[derive(Debug, Clone)]
pub struct NoaaSolarGeometry {
    site: SiteConfig,
    panel: PanelGeometry,
    clear_sky: ClearSkyModel,
}

impl NoaaSolarGeometry {
    pub fn new(site: SiteConfig, panel: PanelGeometry, clear_sky: ClearSkyModel) -> Self {
        Self {
            site,
            panel,
            clear_sky,
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    fn position_at(&self, t: TimePoint) -> SolarPosition {
        solar_position(t, self.site.latitude, self.site.longitude)
    }
}

impl SolarGeometryProvider for NoaaSolarGeometry {
    fn position(&self, instants: &[TimePoint]) -> Vec<SolarPosition> {
        instants.iter().map(|t| self.position_at(*t)).collect()
    }

    fn poa(
        &self,
        instants: &[TimePoint],
        ghi: &[f64],
        dhi: &[f64],
        dni: &[f64],
    ) -> PipelineResult<Vec<f64>> {
        let n = instants.len();
        if ghi.len() != n || dhi.len() != n || dni.len() != n {
            return Err(PipelineError::parse(format!(
                "irradiance components have {}/{}/{} values for {} instants",
                ghi.len(),
                dhi.len(),
                dni.len(),
                n
            ))
            .with_context(ErrorContext::new("solar_geometry")));
        }

        let panel = &self.panel;
        let poa = instants
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let pos = self.position_at(*t);
                let cos_aoi = cos_angle_of_incidence(
                    panel.tilt,
                    panel.azimuth,
                    pos.apparent_zenith,
                    pos.azimuth,
                );
                poa_isotropic(panel.tilt, cos_aoi, ghi[i], dhi[i], dni[i], panel.albedo)
            })
            .collect();
        Ok(poa)
    }

    fn clear_sky_ghi(&self, instants: &[TimePoint]) -> Vec<f64> {
        instants
            .iter()
            .map(|t| {
                let pos = self.position_at(*t);
                match self.clear_sky {
                    ClearSkyModel::Ineichen { linke_turbidity } => ineichen_ghi(
                        pos.apparent_zenith,
                        linke_turbidity,
                        self.site.altitude,
                        extraterrestrial_irradiance(*t),
                    ),
                    ClearSkyModel::Haurwitz => haurwitz_ghi(pos.apparent_zenith),
                }
            })
            .collect()
    }
}
