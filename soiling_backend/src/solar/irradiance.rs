//! Plane-of-array transposition and extraterrestrial irradiance.

use std::f64::consts::PI;

use chrono::Datelike;

use crate::models::TimePoint;

/// Solar constant used by the Spencer series (W/m²).
pub const SOLAR_CONSTANT: f64 = 1366.1;

/// Cosine of the angle of incidence between the sun and a tilted plane.
///
/// All angles in degrees; azimuths clockwise from north.
pub fn cos_angle_of_incidence(
    surface_tilt: f64,
    surface_azimuth: f64,
    solar_zenith: f64,
    solar_azimuth: f64,
) -> f64 {
    let tilt = surface_tilt.to_radians();
    let zenith = solar_zenith.to_radians();
    let projection = tilt.cos() * zenith.cos()
        + tilt.sin() * zenith.sin() * (solar_azimuth - surface_azimuth).to_radians().cos();
    projection.clamp(-1.0, 1.0)
}

/// Isotropic-sky plane-of-array irradiance.
///
/// Sum of the beam component `DNI·max(cos AOI, 0)`, the sky diffuse
/// component `DHI·(1 + cos β)/2` and the ground-reflected component
/// `GHI·albedo·(1 − cos β)/2`, with β the surface tilt.
///
/// # Arguments
/// * `surface_tilt` - Degrees from horizontal
/// * `cos_aoi` - From [`cos_angle_of_incidence`]
/// * `ghi`, `dhi`, `dni` - Measured components (W/m²)
/// * `albedo` - Ground reflectance
pub fn poa_isotropic(
    surface_tilt: f64,
    cos_aoi: f64,
    ghi: f64,
    dhi: f64,
    dni: f64,
    albedo: f64,
) -> f64 {
    let cos_tilt = surface_tilt.to_radians().cos();
    let beam = (dni * cos_aoi).max(0.0);
    let sky_diffuse = dhi * (1.0 + cos_tilt) / 2.0;
    let ground = ghi * albedo * (1.0 - cos_tilt) / 2.0;
    beam + sky_diffuse + ground
}

/// Extraterrestrial normal irradiance for the instant's day of year (Spencer, 1971).
pub fn extraterrestrial_irradiance(t: TimePoint) -> f64 {
    let b = 2.0 * PI * (t.ordinal() as f64 - 1.0) / 365.0;
    SOLAR_CONSTANT
        * (1.000_11
            + 0.034_221 * b.cos()
            + 0.001_28 * b.sin()
            + 0.000_719 * (2.0 * b).cos()
            + 0.000_077 * (2.0 * b).sin())
}
