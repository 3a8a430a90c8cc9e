//! Stateless per-row floors: the current guard and channel floors.

use log::warn;

use crate::config::ChannelFloor;
use crate::models::ChannelRecord;

/// Rows surviving the current filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentFilterOutcome<T> {
    pub kept: Vec<T>,
    pub dropped: usize,
    /// Designated channels that no row carried, so were not applied.
    pub skipped_channels: Vec<String>,
}

/// Drops rows whose designated current channels fall below a floor.
#[derive(Debug, Clone)]
pub struct CurrentThresholdFilter {
    min_amps: f64,
    channels: Vec<String>,
}

impl CurrentThresholdFilter {
    pub fn new(min_amps: f64, channels: Vec<String>) -> Self {
        Self { min_amps, channels }
    }

    /// Apply the filter.
    ///
    /// A channel that no row carries at all is skipped with a warning. For
    /// the remaining channels a row is kept only if every value is present
    /// and `>= min_amps`.
    pub fn filter_by_current<T>(&self, rows: &[T]) -> CurrentFilterOutcome<T>
    where
        T: ChannelRecord + Clone,
    {
        let (active, skipped): (Vec<&String>, Vec<&String>) = self
            .channels
            .iter()
            .partition(|c| rows.iter().any(|r| r.channel(c).is_some()));

        if !rows.is_empty() {
            for channel in &skipped {
                warn!(
                    "Current filter: channel '{}' not present, filter not applied to it",
                    channel
                );
            }
        }

        let kept: Vec<T> = rows
            .iter()
            .filter(|r| {
                active
                    .iter()
                    .all(|c| r.channel(c).map_or(false, |v| v >= self.min_amps))
            })
            .cloned()
            .collect();

        CurrentFilterOutcome {
            dropped: rows.len() - kept.len(),
            kept,
            skipped_channels: skipped.into_iter().cloned().collect(),
        }
    }
}

/// Rows surviving the channel floors.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorOutcome<T> {
    pub kept: Vec<T>,
    pub dropped: usize,
    /// Floor channels that no row carried, so were not applied.
    pub skipped_channels: Vec<String>,
}

/// Whether a row satisfies every floor (missing values fail).
pub fn passes_floors<T: ChannelRecord>(row: &T, floors: &[ChannelFloor]) -> bool {
    floors.iter().all(|floor| {
        floor
            .channels
            .iter()
            .all(|c| row.channel(c).map_or(false, |v| v >= floor.minimum))
    })
}

/// Keep rows satisfying every floor.
///
/// Floor channels absent from every row are skipped with a warning, like the
/// current guard. A null value in a channel other rows carry still fails.
pub fn apply_channel_floors<T>(rows: Vec<T>, floors: &[ChannelFloor]) -> FloorOutcome<T>
where
    T: ChannelRecord,
{
    let mut skipped_channels = Vec::new();
    let active: Vec<ChannelFloor> = floors
        .iter()
        .map(|floor| {
            let (present, absent): (Vec<&String>, Vec<&String>) = floor
                .channels
                .iter()
                .partition(|c| rows.iter().any(|r| r.channel(c).is_some()));
            if !rows.is_empty() {
                for channel in &absent {
                    warn!(
                        "Channel floor: channel '{}' not present, floor not applied to it",
                        channel
                    );
                }
            }
            skipped_channels.extend(absent.into_iter().cloned());
            ChannelFloor {
                channels: present.into_iter().cloned().collect(),
                minimum: floor.minimum,
            }
        })
        .collect();

    let before = rows.len();
    let kept: Vec<T> = rows
        .into_iter()
        .filter(|r| passes_floors(r, &active))
        .collect();
    FloorOutcome {
        dropped: before - kept.len(),
        kept,
        skipped_channels,
    }
}
