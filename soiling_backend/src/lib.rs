//! # Soiling Rust Backend
//!
//! Irradiance reference construction and temporal alignment for soiling-ratio
//! analysis.
//!
//! The crate turns raw irradiance and PV-sensor series into one trustworthy
//! observation per day: rows are filtered to good-light instants, the primary
//! sensor is reduced to the 5-minute window closest to solar noon, every other
//! sensor module is aligned onto those sessions, and days with unstable
//! irradiance are dropped from every table.
//!
//! ## Architecture
//!
//! - [`config`]: immutable TOML configuration (site, panel, thresholds, modules)
//! - [`error`]: error taxonomy with stage/module context
//! - [`models`]: value records passed between stages
//! - [`parsing`]: timestamp normalization and raw row cleanup
//! - [`solar`]: solar position, POA transposition, clear-sky models, solar noon
//! - [`filtering`]: reference builder, backward join, floors, stability gate
//! - [`alignment`]: windowing, session selection, distance statistics, module alignment
//! - [`pipeline`]: end-to-end orchestration and run report
//! - `export`: polars DataFrames of every table (feature `dataframe`)
//!
//! ## Data flow
//!
//! ```text
//! irradiance ─► ReferenceBuilder ─► ReferenceSet
//!                                      │
//! primary / modules ─► TemporalJoiner ◄┘
//!        │
//!        ├─► WindowAggregator ─► SolarNoonSessionSelector ─► sessions
//!        │                                                    │
//!        └───────────────► ModuleAligner ◄── StabilityGate ◄──┘
//! ```
//!
//! Stages log through the `log` facade; binaries choose the subscriber.

pub mod alignment;
pub mod config;
pub mod error;
pub mod filtering;
pub mod models;
pub mod parsing;
pub mod pipeline;
pub mod solar;

#[cfg(feature = "dataframe")]
pub mod export;

pub use config::PipelineConfig;
pub use error::{ErrorContext, PipelineError, PipelineResult};
pub use pipeline::{PipelineInputs, PipelineOutput, RawDataset, RunReport, SoilingPipeline};
