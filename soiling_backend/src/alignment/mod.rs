//! Session construction and module alignment.
//!
//! - [`windows`]: fixed-width window means
//! - [`sessions`]: per-day window closest to solar noon
//! - [`stats`]: distance-to-noon summary statistics
//! - [`modules`]: per-class alignment of secondary modules

pub mod modules;
pub mod sessions;
pub mod stats;
pub mod windows;

pub use modules::{AlignmentClass, AlignmentJob, ModuleAligner, ModuleAlignment};
pub use sessions::{DiscardedDay, SessionSelection, SolarNoonSessionSelector};
pub use stats::compute_distance_stats;
pub use windows::WindowAggregator;
