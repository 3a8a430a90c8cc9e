//! Sensor module samples and the traits stages use to read them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::TimePoint;

/// Channel name → value. `None` marks a missing reading.
pub type Channels = BTreeMap<String, Option<f64>>;

/// Anything positioned on the UTC timeline.
pub trait Timestamped {
    fn timestamp(&self) -> TimePoint;
}

/// Anything carrying named numeric channels.
pub trait ChannelRecord {
    /// Value of a channel, `None` if absent or missing.
    fn channel(&self, name: &str) -> Option<f64>;
}

impl Timestamped for TimePoint {
    fn timestamp(&self) -> TimePoint {
        *self
    }
}

/// One reading of a sensor module.
///
/// `group` identifies a physical unit when one module logs several units on
/// the same clock (e.g. two PV stands reported at the same instant). Samples
/// without a group belong to the module as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSample {
    pub timestamp: TimePoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub channels: Channels,
}

impl ModuleSample {
    pub fn new(timestamp: TimePoint) -> Self {
        Self {
            timestamp,
            group: None,
            channels: Channels::new(),
        }
    }

    /// Builder-style channel assignment.
    pub fn with_channel(mut self, name: impl Into<String>, value: f64) -> Self {
        self.channels.insert(name.into(), Some(value));
        self
    }

    /// Builder-style group assignment.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

impl Timestamped for ModuleSample {
    fn timestamp(&self) -> TimePoint {
        self.timestamp
    }
}

impl ChannelRecord for ModuleSample {
    fn channel(&self, name: &str) -> Option<f64> {
        self.channels.get(name).copied().flatten()
    }
}

/// Per-channel means over a set of samples.
///
/// Missing values are excluded from their channel's mean rather than counted
/// as zero. A channel with no present value anywhere in the set maps to
/// `None`.
pub fn channel_means<'a, I>(samples: I) -> Channels
where
    I: IntoIterator<Item = &'a Channels>,
{
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for channels in samples {
        for (name, value) in channels {
            let entry = sums.entry(name.clone()).or_insert((0.0, 0));
            if let Some(v) = value.filter(|v| v.is_finite()) {
                entry.0 += v;
                entry.1 += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(name, (sum, n))| {
            let mean = if n > 0 { Some(sum / n as f64) } else { None };
            (name, mean)
        })
        .collect()
}
