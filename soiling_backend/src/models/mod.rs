//! Value records passed between pipeline stages.
//!
//! Every record is produced by one stage and consumed, never mutated, by the
//! next.

pub mod irradiance;
pub mod series;
pub mod session;
pub mod time;

pub use irradiance::{IrradianceRecord, IrradianceSample, ReferenceSet, CLEAR_SKY_EPSILON};
pub use series::{channel_means, ChannelRecord, Channels, ModuleSample, Timestamped};
pub use session::{AlignedRow, DailySession, DistanceBand, DistanceStats, WindowRow};
pub use time::TimePoint;
