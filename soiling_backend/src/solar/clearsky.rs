//! Clear-sky global horizontal irradiance models.

/// Sea-level standard pressure (Pa).
pub const STANDARD_PRESSURE: f64 = 101_325.0;

/// Site pressure from altitude with the standard-atmosphere approximation.
pub fn altitude_to_pressure(altitude: f64) -> f64 {
    STANDARD_PRESSURE * (1.0 - 2.255_77e-5 * altitude).powf(5.255_88)
}

/// Kasten-Young (1989) relative air mass; `None` with the sun at or below the horizon.
pub fn relative_airmass(zenith: f64) -> Option<f64> {
    if !(0.0..90.0).contains(&zenith) {
        return None;
    }
    let am = 1.0 / (zenith.to_radians().cos() + 0.505_72 * (96.079_95 - zenith).powf(-1.636_4));
    Some(am)
}

/// Pressure-corrected air mass.
pub fn absolute_airmass(relative: f64, pressure: f64) -> f64 {
    relative * pressure / STANDARD_PRESSURE
}

/// Ineichen-Perez clear-sky GHI (W/m²).
///
/// # Arguments
/// * `apparent_zenith` - Refraction-corrected zenith (degrees)
/// * `linke_turbidity` - Linke turbidity factor
/// * `altitude` - Site altitude (m)
/// * `dni_extra` - Extraterrestrial normal irradiance (W/m²)
///
/// # Returns
/// Zero when the sun is below the horizon.
pub fn ineichen_ghi(apparent_zenith: f64, linke_turbidity: f64, altitude: f64, dni_extra: f64) -> f64 {
    let Some(relative) = relative_airmass(apparent_zenith) else {
        return 0.0;
    };
    let airmass = absolute_airmass(relative, altitude_to_pressure(altitude));
    let cos_zenith = apparent_zenith.to_radians().cos().max(0.0);

    let fh1 = (-altitude / 8000.0).exp();
    let fh2 = (-altitude / 1250.0).exp();
    let cg1 = 5.09e-5 * altitude + 0.868;
    let cg2 = 3.92e-5 * altitude + 0.0387;

    let attenuation = (-cg2 * airmass * (fh1 + fh2 * (linke_turbidity - 1.0))).exp();
    (cg1 * dni_extra * cos_zenith * attenuation.max(0.0)).max(0.0)
}

/// Haurwitz clear-sky GHI (W/m²), zero below the horizon.
pub fn haurwitz_ghi(apparent_zenith: f64) -> f64 {
    let cos_zenith = apparent_zenith.to_radians().cos();
    if cos_zenith <= 0.0 {
        return 0.0;
    }
    1098.0 * cos_zenith * (-0.059 / cos_zenith).exp()
}
