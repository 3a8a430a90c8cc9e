//! Backward-nearest temporal join against the reference set.
//!
//! For a sample at `t` the only eligible reference instant is the greatest
//! `r` with `r <= t`. The sample is kept iff that `r` exists and
//! `t - r <= tolerance`. A later reference instant never matches, however
//! close it is.
//!
//! Both sequences are sorted, so [`TemporalJoiner::filter`] walks them with
//! two pointers in O(n + m). [`TemporalJoiner::backward_match`] answers a
//! single query by binary search in O(log m).

use chrono::Duration;

use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::time::{is_non_decreasing, minutes};
use crate::models::{ReferenceSet, TimePoint, Timestamped};

/// Samples surviving the join and the number discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome<T> {
    pub kept: Vec<T>,
    pub dropped: usize,
}

/// Filters sorted series against a [`ReferenceSet`].
#[derive(Debug, Clone, Copy)]
pub struct TemporalJoiner {
    tolerance: Duration,
}

impl TemporalJoiner {
    pub fn new(tolerance: Duration) -> Self {
        Self { tolerance }
    }

    pub fn from_minutes(tolerance_minutes: f64) -> Self {
        Self::new(minutes(tolerance_minutes))
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Latest reference instant at or before `t`, if within tolerance.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, TimeZone, Utc};
    /// use soiling_rust::filtering::TemporalJoiner;
    ///
    /// let at = |h, m| Utc.with_ymd_and_hms(2024, 8, 1, h, m, 0).unwrap();
    /// let reference = [at(10, 0), at(10, 3), at(10, 8)];
    /// let joiner = TemporalJoiner::new(Duration::minutes(5));
    ///
    /// assert_eq!(joiner.backward_match(&reference, at(10, 7)), Some(at(10, 3)));
    /// assert_eq!(joiner.backward_match(&reference, at(9, 50)), None);
    /// assert_eq!(joiner.backward_match(&reference, at(10, 20)), None);
    /// ```
    pub fn backward_match(&self, reference: &[TimePoint], t: TimePoint) -> Option<TimePoint> {
        let idx = reference.partition_point(|r| *r <= t);
        if idx == 0 {
            return None;
        }
        let r = reference[idx - 1];
        (t - r <= self.tolerance).then_some(r)
    }

    /// Keep the samples that have a backward match.
    ///
    /// # Arguments
    /// * `series` - Samples sorted ascending (equal instants allowed for grouped modules)
    /// * `reference` - Accepted reference instants
    ///
    /// # Errors
    /// `UnsortedSeries` if `series` is not in ascending order.
    pub fn filter<T>(&self, series: &[T], reference: &ReferenceSet) -> PipelineResult<JoinOutcome<T>>
    where
        T: Timestamped + Clone,
    {
        if !is_non_decreasing(series.iter().map(Timestamped::timestamp)) {
            return Err(PipelineError::unsorted("series must be sorted ascending before the join")
                .with_context(ErrorContext::new("join")));
        }

        let refs = reference.instants();
        let mut kept = Vec::with_capacity(series.len());
        let mut j = 0;

        for sample in series {
            let t = sample.timestamp();
            // Advance to the first reference strictly after t
            while j < refs.len() && refs[j] <= t {
                j += 1;
            }
            if j > 0 && t - refs[j - 1] <= self.tolerance {
                kept.push(sample.clone());
            }
        }

        let dropped = series.len() - kept.len();
        Ok(JoinOutcome { kept, dropped })
    }
}
