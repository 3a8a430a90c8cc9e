//! Summary statistics of accepted days' distances to solar noon.

use crate::models::{DistanceBand, DistanceStats};

/// Linearly interpolated quantile of an ascending slice, `q` in [0, 1].
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Compute distance statistics.
///
/// # Arguments
/// * `distances` - Distance to solar noon of every accepted day (minutes)
/// * `bands` - Upper limits of the bands, each counted as `distance <= limit`
///
/// # Returns
/// Statistics with a sample (n-1) standard deviation; all zeros when no day
/// was accepted. Band percentages are rounded to one decimal.
pub fn compute_distance_stats(distances: &[f64], bands: &[f64]) -> DistanceStats {
    let days = distances.len();
    let bands: Vec<DistanceBand> = bands
        .iter()
        .map(|limit| {
            let count = distances.iter().filter(|d| **d <= *limit).count();
            let percentage = if days == 0 {
                0.0
            } else {
                (count as f64 / days as f64 * 1000.0).round() / 10.0
            };
            DistanceBand {
                limit_minutes: *limit,
                count,
                percentage,
            }
        })
        .collect();

    if days == 0 {
        return DistanceStats {
            bands,
            ..Default::default()
        };
    }

    let mut sorted = distances.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mean = sorted.iter().sum::<f64>() / days as f64;
    // Compute sample standard deviation
    let std_dev = if days > 1 {
        let variance = sorted
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (days - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };

    DistanceStats {
        days,
        min: sorted[0],
        max: sorted[days - 1],
        mean,
        median: quantile(&sorted, 0.5),
        std_dev,
        p05: quantile(&sorted, 0.05),
        p25: quantile(&sorted, 0.25),
        p75: quantile(&sorted, 0.75),
        p95: quantile(&sorted, 0.95),
        bands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANDS: [f64; 4] = [10.0, 15.0, 30.0, 45.0];

    #[test]
    fn test_empty() {
        let stats = compute_distance_stats(&[], &BANDS);
        assert_eq!(stats.days, 0);
        assert_eq!(stats.bands.len(), 4);
        assert!(stats.bands.iter().all(|b| b.count == 0 && b.percentage == 0.0));
    }

    #[test]
    fn test_basic_statistics() {
        let stats = compute_distance_stats(&[5.0, 1.0, 3.0, 2.0, 4.0], &BANDS);
        assert_eq!(stats.days, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert!((stats.std_dev - 2.5f64.sqrt()).abs() < 1e-12);
        assert!((stats.p05 - 1.2).abs() < 1e-12);
        assert_eq!(stats.p25, 2.0);
        assert_eq!(stats.p75, 4.0);
        assert!((stats.p95 - 4.8).abs() < 1e-12);
    }

    #[test]
    fn test_bands_are_cumulative() {
        let stats = compute_distance_stats(&[2.0, 12.0, 20.0], &BANDS);
        let counts: Vec<usize> = stats.bands.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2, 3, 3]);
        assert_eq!(stats.bands[0].percentage, 33.3);
        assert_eq!(stats.bands[1].percentage, 66.7);
        assert_eq!(stats.bands[3].percentage, 100.0);
    }

    #[test]
    fn test_single_day_has_zero_spread() {
        let stats = compute_distance_stats(&[7.5], &BANDS);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.median, 7.5);
        assert_eq!(stats.p95, 7.5);
    }
}
