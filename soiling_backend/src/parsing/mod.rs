//! Normalization of raw rows into UTC series.
//!
//! - [`timestamps`]: timestamp parsing with declared-zone handling
//! - [`records`]: row-level normalization with malformed/duplicate accounting

pub mod records;
pub mod timestamps;

pub use records::{normalize_irradiance, normalize_records, NormalizationReport, RawRecord};
pub use timestamps::parse_timestamp;
