//! Solar position from the NOAA solar calculator equations.
//!
//! Accuracy is well below a tenth of a degree for years 1900-2100, far finer
//! than the one-minute sampling used to locate solar noon.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::models::TimePoint;

/// Julian day of the Unix epoch.
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;
/// Julian day of J2000.0.
const J2000: f64 = 2_451_545.0;

/// Sun position for one instant, all angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarPosition {
    pub zenith: f64,
    /// Zenith corrected for atmospheric refraction.
    pub apparent_zenith: f64,
    pub elevation: f64,
    pub apparent_elevation: f64,
    /// Clockwise from north.
    pub azimuth: f64,
}

/// Compute the sun position seen from (`latitude`, `longitude`) at `t`.
///
/// # Arguments
/// * `t` - UTC instant
/// * `latitude` - Degrees north
/// * `longitude` - Degrees east
pub fn solar_position(t: TimePoint, latitude: f64, longitude: f64) -> SolarPosition {
    let julian_day = t.timestamp_millis() as f64 / 86_400_000.0 + UNIX_EPOCH_JULIAN_DAY;
    let jc = (julian_day - J2000) / 36_525.0;

    // Step 1: Sun's ecliptic coordinates
    let mean_long = (280.46646 + jc * (36_000.76983 + jc * 0.000_303_2)).rem_euclid(360.0);
    let mean_anom = 357.52911 + jc * (35_999.05029 - 0.000_153_7 * jc);
    let eccentricity = 0.016_708_634 - jc * (0.000_042_037 + 0.000_000_126_7 * jc);
    let m = mean_anom.to_radians();
    let center = m.sin() * (1.914_602 - jc * (0.004_817 + 0.000_014 * jc))
        + (2.0 * m).sin() * (0.019_993 - 0.000_101 * jc)
        + (3.0 * m).sin() * 0.000_289;
    let true_long = mean_long + center;
    let omega = (125.04 - 1_934.136 * jc).to_radians();
    let apparent_long = true_long - 0.005_69 - 0.004_78 * omega.sin();

    // Step 2: Obliquity and declination
    let mean_obliquity =
        23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.000_59 - jc * 0.001_813))) / 60.0) / 60.0;
    let obliquity = (mean_obliquity + 0.002_56 * omega.cos()).to_radians();
    let declination = (obliquity.sin() * apparent_long.to_radians().sin()).asin();

    // Step 3: Equation of time (minutes)
    let y = (obliquity / 2.0).tan().powi(2);
    let l0 = mean_long.to_radians();
    let equation_of_time = 4.0
        * (y * (2.0 * l0).sin() - 2.0 * eccentricity * m.sin()
            + 4.0 * eccentricity * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * eccentricity * eccentricity * (2.0 * m).sin())
        .to_degrees();

    // Step 4: Hour angle
    let minute_of_day = t.num_seconds_from_midnight() as f64 / 60.0
        + t.nanosecond() as f64 / 60_000_000_000.0;
    let true_solar_time = (minute_of_day + equation_of_time + 4.0 * longitude).rem_euclid(1440.0);
    let hour_angle = true_solar_time / 4.0 - 180.0;

    // Step 5: Zenith and azimuth
    let lat = latitude.to_radians();
    let cos_zenith = (lat.sin() * declination.sin()
        + lat.cos() * declination.cos() * hour_angle.to_radians().cos())
    .clamp(-1.0, 1.0);
    let zenith_rad = cos_zenith.acos();
    let zenith = zenith_rad.to_degrees();
    let elevation = 90.0 - zenith;

    let denominator = lat.cos() * zenith_rad.sin();
    let azimuth = if denominator.abs() < 1e-12 {
        // Sun at the zenith or observer at a pole
        if latitude >= 0.0 {
            180.0
        } else {
            0.0
        }
    } else {
        let arg = ((lat.sin() * cos_zenith - declination.sin()) / denominator).clamp(-1.0, 1.0);
        let base = arg.acos().to_degrees();
        if hour_angle > 0.0 {
            (base + 180.0).rem_euclid(360.0)
        } else {
            (540.0 - base).rem_euclid(360.0)
        }
    };

    let apparent_elevation = elevation + refraction_correction(elevation);
    SolarPosition {
        zenith,
        apparent_zenith: 90.0 - apparent_elevation,
        elevation,
        apparent_elevation,
        azimuth,
    }
}

/// Atmospheric refraction in degrees for a true elevation in degrees.
fn refraction_correction(elevation: f64) -> f64 {
    let arcsec = if elevation > 85.0 {
        0.0
    } else if elevation > 5.0 {
        let te = elevation.to_radians().tan();
        58.1 / te - 0.07 / te.powi(3) + 0.000_086 / te.powi(5)
    } else if elevation > -0.575 {
        1_735.0
            + elevation * (-518.2 + elevation * (103.4 + elevation * (-12.79 + elevation * 0.711)))
    } else {
        -20.772 / elevation.to_radians().tan()
    };
    arcsec / 3_600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const LAT: f64 = -24.08992287800815;
    const LON: f64 = -69.92873664034512;

    #[test]
    fn test_night_at_site() {
        // 04:00 UTC is midnight local
        let t = Utc.with_ymd_and_hms(2024, 8, 1, 4, 0, 0).unwrap();
        let pos = solar_position(t, LAT, LON);
        assert!(pos.elevation < -40.0, "elevation {}", pos.elevation);
    }

    #[test]
    fn test_noon_sun_to_the_north_in_winter() {
        // Southern-hemisphere winter: sun culminates in the north, about 42.5 degrees high
        let t = Utc.with_ymd_and_hms(2024, 6, 21, 16, 42, 0).unwrap();
        let pos = solar_position(t, LAT, LON);
        assert!((pos.elevation - 42.5).abs() < 1.0, "elevation {}", pos.elevation);
        assert!(pos.azimuth < 10.0 || pos.azimuth > 350.0, "azimuth {}", pos.azimuth);
    }

    #[test]
    fn test_morning_sun_in_the_east() {
        let t = Utc.with_ymd_and_hms(2024, 8, 1, 13, 0, 0).unwrap();
        let pos = solar_position(t, LAT, LON);
        assert!(pos.elevation > 0.0);
        assert!(pos.azimuth > 45.0 && pos.azimuth < 90.0, "azimuth {}", pos.azimuth);
    }

    #[test]
    fn test_refraction_raises_sun() {
        let t = Utc.with_ymd_and_hms(2024, 8, 1, 11, 40, 0).unwrap();
        let pos = solar_position(t, LAT, LON);
        assert!(pos.apparent_elevation >= pos.elevation);
        assert!((pos.apparent_zenith - (90.0 - pos.apparent_elevation)).abs() < 1e-12);
        assert_eq!(refraction_correction(89.0), 0.0);
    }
}
