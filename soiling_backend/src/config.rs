//! Pipeline configuration.
//!
//! The configuration is an immutable value loaded once from TOML and threaded
//! into the solar geometry provider and every stage. Thresholds are never
//! mutated during a run.
//!
//! ```toml
//! [site]
//! latitude = -24.0899
//! longitude = -69.9287
//! altitude = 500.0
//!
//! [panel]
//! tilt = 20.0
//! azimuth = 0.0
//!
//! [clear_sky]
//! model = "ineichen"
//! linke_turbidity = 3.0
//!
//! [thresholds]
//! max_solar_noon_distance_minutes = 45.0
//!
//! [[modules]]
//! name = "iv600"
//! alignment = "irregular"
//! timezone = "America/Santiago"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::alignment::AlignmentClass;
use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::time::minutes;

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub site: SiteConfig,
    pub panel: PanelGeometry,
    #[serde(default)]
    pub clear_sky: ClearSkyModel,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default = "default_distance_bands")]
    pub distance_bands_minutes: Vec<f64>,
    #[serde(default)]
    pub primary: PrimaryModuleSpec,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

/// Observer location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres above sea level.
    #[serde(default)]
    pub altitude: f64,
    /// Zone used for naive timestamps of series that declare none.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Orientation of the tilted plane receiving POA irradiance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelGeometry {
    /// Degrees from horizontal.
    pub tilt: f64,
    /// Degrees clockwise from north.
    pub azimuth: f64,
    /// Ground reflectance used for the reflected component.
    #[serde(default = "default_albedo")]
    pub albedo: f64,
}

/// Named clear-sky model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ClearSkyModel {
    Ineichen {
        #[serde(default = "default_linke_turbidity")]
        linke_turbidity: f64,
    },
    Haurwitz,
}

impl Default for ClearSkyModel {
    fn default() -> Self {
        Self::Ineichen {
            linke_turbidity: default_linke_turbidity(),
        }
    }
}

impl ClearSkyModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ineichen { .. } => "ineichen",
            Self::Haurwitz => "haurwitz",
        }
    }
}

/// Acceptance thresholds and tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_poa_minimum")]
    pub poa_minimum: f64,
    #[serde(default = "default_clear_sky_ratio_minimum")]
    pub clear_sky_ratio_minimum: f64,
    #[serde(default = "default_join_tolerance_minutes")]
    pub join_tolerance_minutes: f64,
    #[serde(default = "default_window_minutes")]
    pub window_minutes: f64,
    #[serde(default = "default_max_solar_noon_distance_minutes")]
    pub max_solar_noon_distance_minutes: f64,
    #[serde(default = "default_stability_max_relative_spread")]
    pub stability_max_relative_spread: f64,
    #[serde(default = "default_current_minimum_amps")]
    pub current_minimum_amps: f64,
    #[serde(default = "default_irregular_max_distance_minutes")]
    pub irregular_max_distance_minutes: f64,
    /// Unset means medium-frequency alignment has no distance bound.
    #[serde(default)]
    pub medium_max_distance_minutes: Option<f64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            poa_minimum: default_poa_minimum(),
            clear_sky_ratio_minimum: default_clear_sky_ratio_minimum(),
            join_tolerance_minutes: default_join_tolerance_minutes(),
            window_minutes: default_window_minutes(),
            max_solar_noon_distance_minutes: default_max_solar_noon_distance_minutes(),
            stability_max_relative_spread: default_stability_max_relative_spread(),
            current_minimum_amps: default_current_minimum_amps(),
            irregular_max_distance_minutes: default_irregular_max_distance_minutes(),
            medium_max_distance_minutes: None,
        }
    }
}

impl Thresholds {
    pub fn join_tolerance(&self) -> Duration {
        minutes(self.join_tolerance_minutes)
    }

    pub fn window(&self) -> Duration {
        minutes(self.window_minutes)
    }
}

/// Irradiance channel used to judge stability within a session window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityChannel {
    #[serde(rename = "POA")]
    Poa,
    #[serde(rename = "GHI")]
    Ghi,
}

impl Default for StabilityChannel {
    fn default() -> Self {
        Self::Poa
    }
}

/// Stability gate settings beyond the spread threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    #[serde(default)]
    pub channel: StabilityChannel,
    /// Fewer reference samples than this inside the window count as no coverage.
    #[serde(default = "default_stability_min_samples")]
    pub min_samples: usize,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            channel: StabilityChannel::default(),
            min_samples: default_stability_min_samples(),
        }
    }
}

/// Lower bound applied to a set of channels; a row fails if any is below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFloor {
    pub channels: Vec<String>,
    pub minimum: f64,
}

/// The sensor whose windows define the daily sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryModuleSpec {
    #[serde(default = "default_primary_name")]
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "default_current_channels")]
    pub current_channels: Vec<String>,
    #[serde(default)]
    pub channel_floors: Vec<ChannelFloor>,
}

impl Default for PrimaryModuleSpec {
    fn default() -> Self {
        Self {
            name: default_primary_name(),
            timezone: None,
            current_channels: default_current_channels(),
            channel_floors: Vec::new(),
        }
    }
}

/// A secondary sensor module aligned onto the sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub alignment: AlignmentClass,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub channel_floors: Vec<ChannelFloor>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_albedo() -> f64 {
    0.25
}

fn default_linke_turbidity() -> f64 {
    3.0
}

fn default_poa_minimum() -> f64 {
    500.0
}

fn default_clear_sky_ratio_minimum() -> f64 {
    0.8
}

fn default_join_tolerance_minutes() -> f64 {
    5.0
}

fn default_window_minutes() -> f64 {
    5.0
}

fn default_max_solar_noon_distance_minutes() -> f64 {
    45.0
}

fn default_stability_max_relative_spread() -> f64 {
    0.10
}

fn default_current_minimum_amps() -> f64 {
    1.0
}

fn default_irregular_max_distance_minutes() -> f64 {
    60.0
}

fn default_stability_min_samples() -> usize {
    2
}

fn default_distance_bands() -> Vec<f64> {
    vec![10.0, 15.0, 30.0, 45.0]
}

fn default_primary_name() -> String {
    "soiling_kit".to_string()
}

fn default_current_channels() -> Vec<String> {
    vec!["Isc(e)".to_string(), "Isc(p)".to_string()]
}

impl PipelineConfig {
    /// Build a configuration with default thresholds and no secondary modules.
    pub fn new(site: SiteConfig, panel: PanelGeometry) -> Self {
        Self {
            site,
            panel,
            clear_sky: ClearSkyModel::default(),
            thresholds: Thresholds::default(),
            stability: StabilityConfig::default(),
            distance_bands_minutes: default_distance_bands(),
            primary: PrimaryModuleSpec::default(),
            modules: Vec::new(),
        }
    }

    /// Load and validate a configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(PipelineConfig)` if the file parses and passes validation
    /// * `Err(PipelineError)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::configuration(format!("Failed to read config file: {}", e)).with_context(
                ErrorContext::new("config").with_details(path.as_ref().display().to_string()),
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        let config: PipelineConfig = toml::from_str(content).map_err(|e| {
            PipelineError::configuration(format!("Failed to parse config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every geometric and threshold setting.
    pub fn validate(&self) -> PipelineResult<()> {
        let site = &self.site;
        check_range("site.latitude", site.latitude, -90.0, 90.0)?;
        check_range("site.longitude", site.longitude, -180.0, 180.0)?;
        if !site.altitude.is_finite() {
            return Err(PipelineError::configuration("site.altitude must be finite"));
        }
        parse_zone(&site.timezone)?;

        let panel = &self.panel;
        check_range("panel.tilt", panel.tilt, 0.0, 90.0)?;
        if !(panel.azimuth.is_finite() && (0.0..360.0).contains(&panel.azimuth)) {
            return Err(PipelineError::configuration(format!(
                "panel.azimuth must be in [0, 360), got {}",
                panel.azimuth
            )));
        }
        check_range("panel.albedo", panel.albedo, 0.0, 1.0)?;

        if let ClearSkyModel::Ineichen { linke_turbidity } = self.clear_sky {
            check_positive("clear_sky.linke_turbidity", linke_turbidity)?;
        }

        let t = &self.thresholds;
        check_non_negative("thresholds.poa_minimum", t.poa_minimum)?;
        check_non_negative("thresholds.clear_sky_ratio_minimum", t.clear_sky_ratio_minimum)?;
        check_positive("thresholds.join_tolerance_minutes", t.join_tolerance_minutes)?;
        check_positive("thresholds.window_minutes", t.window_minutes)?;
        let seconds = t.window_minutes * 60.0;
        if seconds < 1.0 || (seconds - seconds.round()).abs() > 1e-9 {
            return Err(PipelineError::configuration(format!(
                "thresholds.window_minutes must be a whole number of seconds, got {}",
                t.window_minutes
            )));
        }
        if 86_400 % (seconds.round() as i64) != 0 {
            return Err(PipelineError::configuration(format!(
                "thresholds.window_minutes must divide a day, got {}",
                t.window_minutes
            )));
        }
        check_non_negative(
            "thresholds.max_solar_noon_distance_minutes",
            t.max_solar_noon_distance_minutes,
        )?;
        check_positive(
            "thresholds.stability_max_relative_spread",
            t.stability_max_relative_spread,
        )?;
        check_non_negative("thresholds.current_minimum_amps", t.current_minimum_amps)?;
        check_non_negative(
            "thresholds.irregular_max_distance_minutes",
            t.irregular_max_distance_minutes,
        )?;
        if let Some(limit) = t.medium_max_distance_minutes {
            check_non_negative("thresholds.medium_max_distance_minutes", limit)?;
        }

        for band in &self.distance_bands_minutes {
            check_non_negative("distance_bands_minutes", *band)?;
        }

        if let Some(ref zone) = self.primary.timezone {
            parse_zone(zone)?;
        }
        for floor in &self.primary.channel_floors {
            check_non_negative("primary.channel_floors.minimum", floor.minimum)?;
        }

        let mut names = HashSet::new();
        names.insert(self.primary.name.as_str());
        for module in &self.modules {
            if !names.insert(module.name.as_str()) {
                return Err(PipelineError::configuration(format!(
                    "duplicate module name '{}'",
                    module.name
                )));
            }
            if let Some(ref zone) = module.timezone {
                parse_zone(zone)?;
            }
            for floor in &module.channel_floors {
                check_non_negative("modules.channel_floors.minimum", floor.minimum)?;
            }
        }

        Ok(())
    }

    /// Zone for naive timestamps of the irradiance series.
    pub fn site_zone(&self) -> PipelineResult<Tz> {
        parse_zone(&self.site.timezone)
    }

    /// Zone for naive timestamps of a module, falling back to the site zone.
    pub fn zone_for(&self, module_zone: Option<&str>) -> PipelineResult<Tz> {
        match module_zone {
            Some(zone) => parse_zone(zone),
            None => self.site_zone(),
        }
    }

    /// Declared spec of a secondary module.
    pub fn module(&self, name: &str) -> Option<&ModuleSpec> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Parse an IANA zone name.
pub fn parse_zone(name: &str) -> PipelineResult<Tz> {
    name.parse::<Tz>().map_err(|e| {
        PipelineError::configuration(format!("unknown timezone '{}': {}", name, e))
    })
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> PipelineResult<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PipelineError::configuration(format!(
            "{} must be in [{}, {}], got {}",
            field, min, max, value
        )))
    }
}

fn check_non_negative(field: &str, value: f64) -> PipelineResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PipelineError::configuration(format!(
            "{} must be a non-negative number, got {}",
            field, value
        )))
    }
}

fn check_positive(field: &str, value: f64) -> PipelineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::configuration(format!(
            "{} must be positive, got {}",
            field, value
        )))
    }
}
