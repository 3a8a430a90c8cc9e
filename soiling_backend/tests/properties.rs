mod support;

use chrono::Duration;
use proptest::prelude::*;

use soiling_rust::filtering::{ReferenceBuilder, TemporalJoiner};
use soiling_rust::models::{IrradianceSample, ReferenceSet, TimePoint};

use support::{at, SyntheticSun};

fn base() -> TimePoint {
    at(1, 10, 0)
}

/// Irradiance rows at distinct minute offsets with arbitrary GHI.
fn irradiance_strategy() -> impl Strategy<Value = Vec<IrradianceSample>> {
    prop::collection::btree_map(0i64..600, 0.0f64..1300.0, 0..120).prop_map(|rows| {
        rows.into_iter()
            .map(|(minute, ghi)| {
                IrradianceSample::new(base() + Duration::minutes(minute), ghi, 80.0, 900.0)
            })
            .collect()
    })
}

fn offsets_strategy(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..7200, 0..max_len).prop_map(|mut v| {
        v.sort_unstable();
        v
    })
}

/// Greatest reference at or before `t`, by linear scan.
fn brute_force_kept(reference: &[TimePoint], t: TimePoint, tolerance: Duration) -> bool {
    reference
        .iter()
        .filter(|r| **r <= t)
        .max()
        .map_or(false, |r| t - *r <= tolerance)
}

proptest! {
    #[test]
    fn prop_reference_build_idempotent(samples in irradiance_strategy()) {
        let sun = SyntheticSun::new(12, 0);
        let builder = ReferenceBuilder::new(&sun, 500.0, 0.8);
        let first = builder.build(&samples).unwrap();
        let second = builder.build(&samples).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_raising_thresholds_never_grows_reference(
        samples in irradiance_strategy(),
        poa_a in 0.0f64..1200.0,
        poa_delta in 0.0f64..500.0,
        ratio_a in 0.0f64..1.2,
        ratio_delta in 0.0f64..0.5,
    ) {
        let sun = SyntheticSun::new(12, 0);
        let loose = ReferenceBuilder::new(&sun, poa_a, ratio_a).build(&samples).unwrap();
        let strict_poa = ReferenceBuilder::new(&sun, poa_a + poa_delta, ratio_a)
            .build(&samples)
            .unwrap();
        let strict_ratio = ReferenceBuilder::new(&sun, poa_a, ratio_a + ratio_delta)
            .build(&samples)
            .unwrap();

        prop_assert!(strict_poa.set.len() <= loose.set.len());
        prop_assert!(strict_ratio.set.len() <= loose.set.len());
        for t in strict_poa.set.instants().iter().chain(strict_ratio.set.instants()) {
            prop_assert!(loose.set.contains(*t));
        }
    }

    #[test]
    fn prop_join_matches_brute_force(
        reference in offsets_strategy(60),
        series in offsets_strategy(200),
        tolerance_s in 0i64..900,
    ) {
        let to_time = |s: &i64| base() + Duration::seconds(*s);
        let refs = ReferenceSet::from_instants(reference.iter().map(to_time));
        let samples: Vec<TimePoint> = series.iter().map(to_time).collect();
        let tolerance = Duration::seconds(tolerance_s);

        let outcome = TemporalJoiner::new(tolerance).filter(&samples, &refs).unwrap();
        let expected: Vec<TimePoint> = samples
            .iter()
            .copied()
            .filter(|t| brute_force_kept(refs.instants(), *t, tolerance))
            .collect();

        prop_assert_eq!(outcome.dropped, samples.len() - expected.len());
        prop_assert_eq!(outcome.kept, expected);
    }
}
