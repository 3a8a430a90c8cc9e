//! Row- and day-level filters.
//!
//! - [`reference`]: good-irradiance reference construction
//! - [`join`]: backward-nearest join against the reference
//! - [`thresholds`]: current guard and channel floors
//! - [`stability`]: irradiance stability gate

pub mod join;
pub mod reference;
pub mod stability;
pub mod thresholds;

pub use join::{JoinOutcome, TemporalJoiner};
pub use reference::{ReferenceBuilder, ReferenceOutput};
pub use stability::{retain_days, DayStability, StabilityGate, StabilityVerdict};
pub use thresholds::{
    apply_channel_floors, CurrentFilterOutcome, CurrentThresholdFilter, FloorOutcome,
};
