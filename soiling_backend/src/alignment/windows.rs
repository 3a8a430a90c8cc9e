//! Fixed-width window aggregation.

use std::collections::BTreeMap;

use chrono::Duration;

use crate::models::time::{floor_to_window, minutes};
use crate::models::{channel_means, Channels, ModuleSample, TimePoint, WindowRow};

/// Buckets samples into epoch-aligned windows and averages each channel.
#[derive(Debug, Clone, Copy)]
pub struct WindowAggregator {
    width: Duration,
}

impl WindowAggregator {
    pub fn new(width: Duration) -> Self {
        Self { width }
    }

    pub fn from_minutes(window_minutes: f64) -> Self {
        Self::new(minutes(window_minutes))
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    /// Start of the window containing `t`.
    pub fn window_start(&self, t: TimePoint) -> TimePoint {
        floor_to_window(t, self.width)
    }

    /// One row per non-empty window, ascending by `window_start`.
    ///
    /// Missing channel values are excluded from that channel's mean.
    pub fn aggregate(&self, series: &[ModuleSample]) -> Vec<WindowRow> {
        let mut buckets: BTreeMap<TimePoint, Vec<&Channels>> = BTreeMap::new();
        for sample in series {
            buckets
                .entry(self.window_start(sample.timestamp))
                .or_default()
                .push(&sample.channels);
        }

        let half = self.width / 2;
        buckets
            .into_iter()
            .map(|(start, members)| WindowRow {
                window_start: start,
                window_center: start + half,
                sample_count: members.len(),
                channels: channel_means(members),
            })
            .collect()
    }
}
