//! Soiling alignment runner
//!
//! Reads a TOML configuration and a JSON dataset of raw series, runs the
//! alignment pipeline and writes the resulting tables and run report as JSON.
//!
//! # Usage
//!
//! ```bash
//! soiling-align config.toml dataset.json [output.json]
//! ```
//!
//! The dataset has the shape
//! `{"irradiance": [...], "primary": [...], "modules": {"<name>": [...]}}`,
//! each row being `{"timestamp": "...", "group": null, "channels": {...}}`.
//! Without an output path the result is written to stdout.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use soiling_rust::parsing::NormalizationReport;
use soiling_rust::pipeline::PipelineOutput;
use soiling_rust::{PipelineConfig, PipelineInputs, RawDataset, SoilingPipeline};

#[derive(Serialize)]
struct RunDocument<'a> {
    normalization: &'a std::collections::BTreeMap<String, NormalizationReport>,
    #[serde(flatten)]
    output: &'a PipelineOutput,
}

fn main() -> Result<()> {
    // Initialize logging; the subscriber also receives the library's `log` records
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: {} <config.toml> <dataset.json> [output.json]", args[0]);
    }
    let config_path = Path::new(&args[1]);
    let dataset_path = Path::new(&args[2]);
    let output_path = args.get(3).map(Path::new);

    info!("Loading configuration from {}", config_path.display());
    let config = PipelineConfig::from_file(config_path)
        .with_context(|| format!("Invalid configuration {}", config_path.display()))?;

    let content = fs::read_to_string(dataset_path)
        .with_context(|| format!("Failed to read dataset {}", dataset_path.display()))?;
    let raw: RawDataset = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset {}", dataset_path.display()))?;

    let (inputs, normalization) = PipelineInputs::from_raw(&config, &raw)?;
    for (series, report) in &normalization {
        info!(
            "{}: {} of {} rows accepted",
            series, report.accepted, report.total
        );
    }

    let pipeline = SoilingPipeline::from_config(config)?;
    let output = pipeline.run(&inputs)?;

    let document = RunDocument {
        normalization: &normalization,
        output: &output,
    };
    let json = serde_json::to_string_pretty(&document).context("Failed to serialize output")?;

    match output_path {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write output {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    info!(
        "Done: {} sessions, {} modules aligned",
        output.sessions.len(),
        output.modules.len()
    );
    Ok(())
}
