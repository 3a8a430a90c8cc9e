//! Conversion of pipeline tables into polars DataFrames.
//!
//! Timestamps are rendered as RFC 3339 strings and dates as `YYYY-MM-DD`.
//! Channel columns are nullable f64, one per channel name seen in any row,
//! in name order.

use std::collections::BTreeSet;

use polars::prelude::*;

use crate::alignment::ModuleAlignment;
use crate::models::{Channels, DailySession, DistanceStats, IrradianceRecord, TimePoint};

fn rfc3339(values: impl Iterator<Item = TimePoint>) -> Vec<String> {
    values.map(|t| t.to_rfc3339()).collect()
}

/// One nullable column per channel present in any of the rows.
fn channel_columns<'a>(rows: impl Iterator<Item = &'a Channels> + Clone) -> Vec<Column> {
    let names: BTreeSet<&String> = rows.clone().flat_map(|c| c.keys()).collect();
    names
        .into_iter()
        .map(|name| {
            let values: Vec<Option<f64>> = rows
                .clone()
                .map(|c| c.get(name).copied().flatten())
                .collect();
            Column::new(name.as_str().into(), values)
        })
        .collect()
}

/// Reference table: measured and derived irradiance of accepted rows.
pub fn reference_frame(records: &[IrradianceRecord]) -> PolarsResult<DataFrame> {
    df!(
        "timestamp" => rfc3339(records.iter().map(|r| r.timestamp)),
        "GHI" => records.iter().map(|r| r.ghi).collect::<Vec<f64>>(),
        "DHI" => records.iter().map(|r| r.dhi).collect::<Vec<f64>>(),
        "DNI" => records.iter().map(|r| r.dni).collect::<Vec<f64>>(),
        "POA" => records.iter().map(|r| r.poa).collect::<Vec<f64>>(),
        "GHI_clear_sky" => records.iter().map(|r| r.ghi_clear_sky).collect::<Vec<f64>>(),
        "clear_sky_ratio" => records.iter().map(|r| r.clear_sky_ratio).collect::<Vec<Option<f64>>>(),
    )
}

/// Session table: one row per day with the primary module's window means.
pub fn sessions_frame(sessions: &[DailySession]) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Column::new(
            "date".into(),
            sessions.iter().map(|s| s.date.to_string()).collect::<Vec<String>>(),
        ),
        Column::new(
            "window_start".into(),
            rfc3339(sessions.iter().map(|s| s.window_start)),
        ),
        Column::new(
            "window_center".into(),
            rfc3339(sessions.iter().map(|s| s.window_center)),
        ),
        Column::new(
            "solar_noon".into(),
            rfc3339(sessions.iter().map(|s| s.solar_noon)),
        ),
        Column::new(
            "distance_to_solar_noon_min".into(),
            sessions
                .iter()
                .map(|s| s.distance_to_solar_noon_minutes)
                .collect::<Vec<f64>>(),
        ),
        Column::new(
            "sample_count".into(),
            sessions.iter().map(|s| s.sample_count as u64).collect::<Vec<u64>>(),
        ),
    ];
    columns.extend(channel_columns(sessions.iter().map(|s| &s.channels)));
    DataFrame::new(columns)
}

/// Single-row statistics table with one count/percentage pair per band.
pub fn distance_stats_frame(stats: &DistanceStats) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Column::new("days".into(), [stats.days as u64]),
        Column::new("min".into(), [stats.min]),
        Column::new("max".into(), [stats.max]),
        Column::new("mean".into(), [stats.mean]),
        Column::new("median".into(), [stats.median]),
        Column::new("std".into(), [stats.std_dev]),
        Column::new("p05".into(), [stats.p05]),
        Column::new("p25".into(), [stats.p25]),
        Column::new("p75".into(), [stats.p75]),
        Column::new("p95".into(), [stats.p95]),
    ];
    for band in &stats.bands {
        let label = format!("{}", band.limit_minutes);
        columns.push(Column::new(
            format!("within_{}_min_count", label).into(),
            [band.count as u64],
        ));
        columns.push(Column::new(
            format!("within_{}_min_pct", label).into(),
            [band.percentage],
        ));
    }
    DataFrame::new(columns)
}

/// Aligned table of one module.
pub fn module_frame(alignment: &ModuleAlignment) -> PolarsResult<DataFrame> {
    let rows = &alignment.rows;
    let mut columns = vec![
        Column::new(
            "date".into(),
            rows.iter().map(|r| r.date.to_string()).collect::<Vec<String>>(),
        ),
        Column::new("timestamp".into(), rfc3339(rows.iter().map(|r| r.timestamp))),
    ];
    if rows.iter().any(|r| r.group.is_some()) {
        columns.push(Column::new(
            "group".into(),
            rows.iter().map(|r| r.group.clone()).collect::<Vec<Option<String>>>(),
        ));
    }
    columns.push(Column::new(
        "alignment_distance_min".into(),
        rows.iter().map(|r| r.distance_minutes).collect::<Vec<Option<f64>>>(),
    ));
    columns.push(Column::new(
        "sample_count".into(),
        rows.iter().map(|r| r.sample_count as u64).collect::<Vec<u64>>(),
    ));
    columns.extend(channel_columns(rows.iter().map(|r| &r.channels)));
    DataFrame::new(columns)
}
