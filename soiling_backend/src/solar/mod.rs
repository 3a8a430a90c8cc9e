//! Solar geometry: sun position, plane-of-array transposition, clear-sky
//! irradiance and solar noon.
//!
//! Stages depend only on the [`SolarGeometryProvider`] trait; the default
//! [`NoaaSolarGeometry`] is a self-contained ephemeris.

pub mod clearsky;
pub mod irradiance;
pub mod position;
pub mod provider;

pub use position::SolarPosition;
pub use provider::{NoaaSolarGeometry, SolarGeometryProvider};
