//! Property-based tests using proptest
//!
//! Aggregates must agree with a direct computation over the same values,
//! whatever the accumulator variant.

use proptest::prelude::*;
use statistics_keeper::statistics::PercentileEstimator;
use statistics_keeper::{Action, BasicsKind, StatisticsKeeper};

fn kind() -> impl Strategy<Value = BasicsKind> {
    prop_oneof![Just(BasicsKind::Direct), Just(BasicsKind::Histogram)]
}

proptest! {
    #[test]
    fn prop_aggregates_match_direct_computation(
        kind in kind(),
        values in prop::collection::vec(-1_000_000_000i64..1_000_000_000, 1..200),
    ) {
        let sk = StatisticsKeeper::with_basics("prop", kind).unwrap();
        for &v in &values {
            sk.add_value(v);
        }
        let state = sk.cumulative();
        let n = values.len() as f64;
        let sum: i64 = values.iter().sum();

        prop_assert_eq!(state.count, values.len() as u64);
        prop_assert_eq!(state.min, values.iter().copied().min());
        prop_assert_eq!(state.max, values.iter().copied().max());
        prop_assert_eq!(state.sum, sum);

        let avg = state.avg().unwrap();
        prop_assert!((avg - sum as f64 / n).abs() < 1e-9);

        // sample variance; the integral truncation costs at most one unit
        let mean = sum as f64 / n;
        let expected = if values.len() > 1 {
            values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        let variance = state.variance().unwrap();
        prop_assert!(variance >= 0.0);
        prop_assert!((variance - expected).abs() <= 1.0 + expected * 1e-9,
            "variance {} vs {}", variance, expected);
    }

    #[test]
    fn prop_variants_agree_over_full_range(values in prop::collection::vec(any::<i64>(), 1..100)) {
        let direct = StatisticsKeeper::with_basics("direct", BasicsKind::Direct).unwrap();
        let histogram = StatisticsKeeper::with_basics("hdr", BasicsKind::Histogram).unwrap();
        for &v in &values {
            direct.add_value(v);
            histogram.add_value(v);
        }
        let (d, h) = (direct.cumulative(), histogram.cumulative());
        prop_assert_eq!(h.min, values.iter().copied().min());
        prop_assert_eq!(h.max, values.iter().copied().max());
        prop_assert_eq!(d, h);
        prop_assert_eq!(direct.interval(), histogram.interval());
    }

    #[test]
    fn prop_buckets_non_decreasing(values in prop::collection::vec(0i64..20_000, 0..300)) {
        let mut est = PercentileEstimator::new(vec![100, 1_000, 2_000, 10_000]).unwrap();
        for &v in &values {
            est.record(v);
        }
        let buckets = est.buckets();
        for pair in buckets.windows(2) {
            prop_assert!(pair[0].cumulative_count <= pair[1].cumulative_count);
        }
        prop_assert_eq!(est.total(), values.len() as u64);
        let above: u64 = values.iter().filter(|&&v| v >= 10_000).count() as u64;
        prop_assert_eq!(buckets[3].cumulative_count + above, est.total());
    }

    #[test]
    fn prop_percentiles_monotonic_and_bounded(values in prop::collection::vec(0i64..20_000, 1..300)) {
        let mut est = PercentileEstimator::new(vec![100, 1_000, 2_000, 10_000]).unwrap();
        for &v in &values {
            est.record(v);
        }
        let min = values.iter().copied().min();
        let max = values.iter().copied().max();

        let mut previous = f64::MIN;
        for p in (0..=100).step_by(5) {
            let estimate = est.estimate_percentile(p as f64, min, max).unwrap();
            prop_assert!(estimate >= previous, "p{} went backwards", p);
            prop_assert!(estimate >= min.unwrap() as f64 && estimate <= max.unwrap() as f64);
            previous = estimate;
        }
    }

    #[test]
    fn prop_count_never_decreases(
        batches in prop::collection::vec(prop::collection::vec(0i64..5_000, 0..50), 1..10),
    ) {
        let sk = StatisticsKeeper::with_basics("mono", BasicsKind::Direct).unwrap();
        let mut last = 0;
        let mut interval_sum = 0;
        for batch in &batches {
            for &v in batch {
                sk.add_value(v);
            }
            let count = sk.cumulative().count;
            prop_assert!(count >= last);
            last = count;
            interval_sum += sk.perform_action(Action::MarkFull).count;
        }
        prop_assert_eq!(interval_sum, last);
    }
}
