/// Percentage of the smaller feature set that found a good match.
///
/// Returns `0.0` when either set is empty. The result lies in `[0, 100]` as
/// long as `good` does not exceed the smaller set, which holds for matches
/// produced by the ratio test since the probe contributes at most one match
/// per descriptor.
pub fn similarity_score(good: usize, probe_count: usize, candidate_count: usize) -> f32 {
    let denominator = probe_count.min(candidate_count);
    if denominator == 0 {
        return 0.0;
    }
    good as f32 / denominator as f32 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_scores() {
        assert_eq!(similarity_score(40, 100, 80), 50.0);
        assert_eq!(similarity_score(0, 10, 10), 0.0);
        assert_eq!(similarity_score(10, 10, 10), 100.0);
    }

    #[test]
    fn test_empty_side_scores_zero() {
        assert_eq!(similarity_score(0, 0, 50), 0.0);
        assert_eq!(similarity_score(3, 50, 0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_score_bounded(probe in 0usize..2000, candidate in 0usize..2000, frac in 0.0f64..=1.0) {
            let good = (probe.min(candidate) as f64 * frac) as usize;
            let score = similarity_score(good, probe, candidate);
            prop_assert!((0.0..=100.0).contains(&score));
        }

        #[test]
        fn prop_score_monotonic_in_good(probe in 1usize..2000, candidate in 1usize..2000, a in 0usize..2000, b in 0usize..2000) {
            let limit = probe.min(candidate);
            let (lo, hi) = (a.min(b).min(limit), a.max(b).min(limit));
            prop_assert!(similarity_score(lo, probe, candidate) <= similarity_score(hi, probe, candidate));
        }

        #[test]
        fn prop_score_symmetric(good in 0usize..100, probe in 0usize..2000, candidate in 0usize..2000) {
            prop_assert_eq!(similarity_score(good, probe, candidate), similarity_score(good, candidate, probe));
        }
    }
}
