//! Property-based tests for the measurement side of the harness.
//!
//! These tests verify invariants that should hold regardless of input:
//! - Similarity scores are bounded and symmetric
//! - Every dataset member is its own nearest neighbor
//! - Recall is always in [0, 1] and counts every query
//! - Latency statistics are ordered and deterministic

use std::time::Duration;

use annharness::benchmark::metrics::{mean_latency, percentile, recall_at_1, summarize, LatencySample};
use annharness::client::{Match, QueryResult};
use annharness::driver::{FailureKind, QueryOutcome};
use proptest::prelude::*;

mod similarity_props {
    use super::*;
    use annharness::similarity::{cosine, normalize};

    prop_compose! {
        fn arb_vector(dim: usize)(vec in prop::collection::vec(-10.0f32..10.0, dim)) -> Vec<f32> {
            vec
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn cosine_in_range(
            a in arb_vector(32),
            b in arb_vector(32),
        ) {
            let c = cosine(&a, &b);
            prop_assert!((-1.0..=1.0).contains(&c), "cosine out of range: {}", c);
        }

        #[test]
        fn cosine_symmetric(
            a in arb_vector(16),
            b in arb_vector(16),
        ) {
            prop_assert_eq!(cosine(&a, &b), cosine(&b, &a));
        }

        #[test]
        fn normalized_has_unit_norm(v in arb_vector(24)) {
            if let Some(n) = normalize(&v) {
                let len: f32 = n.iter().map(|x| x * x).sum::<f32>().sqrt();
                prop_assert!((len - 1.0).abs() < 1e-4, "norm {}", len);
            }
        }
    }
}

mod oracle_props {
    use super::*;
    use annharness::benchmark::datasets::generate;
    use annharness::benchmark::oracle::nearest_neighbor;
    use annharness::SimilarityMetric;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn member_is_own_nearest_neighbor(
            n in 1usize..100,
            dim in 8usize..32,
            seed in any::<u64>(),
            normalized in any::<bool>(),
        ) {
            let dataset = generate(n, dim, Some(seed), normalized).unwrap();
            for v in dataset.vectors().iter().take(10) {
                let id = nearest_neighbor(&v.values, &dataset, SimilarityMetric::Cosine).unwrap();
                prop_assert_eq!(id, v.id);
            }
        }

        #[test]
        fn normalized_dot_product_self_match(
            n in 1usize..60,
            dim in 8usize..32,
            seed in any::<u64>(),
        ) {
            let dataset = generate(n, dim, Some(seed), true).unwrap();
            for v in dataset.vectors().iter().take(10) {
                let id = nearest_neighbor(&v.values, &dataset, SimilarityMetric::DotProduct).unwrap();
                prop_assert_eq!(id, v.id);
            }
        }

        #[test]
        fn generation_is_reproducible(
            n in 0usize..50,
            dim in 1usize..16,
            seed in any::<u64>(),
        ) {
            let a = generate(n, dim, Some(seed), false).unwrap();
            let b = generate(n, dim, Some(seed), false).unwrap();
            prop_assert_eq!(a.vectors(), b.vectors());
        }
    }
}

mod recall_props {
    use super::*;

    /// `None` is a failed request, `Some(vec![])` an empty answer.
    fn outcome(top: Option<Vec<u64>>) -> QueryOutcome {
        match top {
            None => QueryOutcome::Failed(FailureKind::Status {
                status: 500,
                body: String::new(),
            }),
            Some(ids) => QueryOutcome::Completed(QueryResult {
                matches: ids.into_iter().map(|id| Match { id, score: 0.0 }).collect(),
            }),
        }
    }

    fn arb_outcomes(n: usize) -> impl Strategy<Value = Vec<QueryOutcome>> {
        prop::collection::vec(
            prop::option::of(prop::collection::vec(0u64..20, 0..3)),
            n,
        )
        .prop_map(|v| v.into_iter().map(outcome).collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn recall_in_unit_interval(
            (outcomes, truth) in (0usize..80).prop_flat_map(|n| {
                (arb_outcomes(n), prop::collection::vec(0u64..20, n))
            }),
        ) {
            let (hits, recall) = recall_at_1(&outcomes, &truth).unwrap();
            prop_assert!((0.0..=1.0).contains(&recall));
            prop_assert!(hits <= outcomes.len());
        }

        #[test]
        fn perfect_answers_give_full_recall(truth in prop::collection::vec(0u64..1000, 1..80)) {
            let outcomes: Vec<_> = truth.iter().map(|&id| outcome(Some(vec![id]))).collect();
            let (hits, recall) = recall_at_1(&outcomes, &truth).unwrap();
            prop_assert_eq!(hits, truth.len());
            prop_assert_eq!(recall, 1.0);
        }

        #[test]
        fn failures_only_lower_recall(
            truth in prop::collection::vec(0u64..1000, 1..80),
            failed in prop::collection::vec(any::<bool>(), 80),
        ) {
            let outcomes: Vec<_> = truth
                .iter()
                .zip(&failed)
                .map(|(&id, &f)| if f { outcome(None) } else { outcome(Some(vec![id])) })
                .collect();
            let n_failed = outcomes.iter().filter(|o| o.is_failed()).count();

            let (hits, recall) = recall_at_1(&outcomes, &truth).unwrap();
            prop_assert_eq!(hits, truth.len() - n_failed);
            let expected = (truth.len() - n_failed) as f64 / truth.len() as f64;
            prop_assert!((recall - expected).abs() < 1e-12);
        }
    }
}

mod latency_props {
    use super::*;

    fn samples(micros: &[u64]) -> Vec<LatencySample> {
        micros
            .iter()
            .enumerate()
            .map(|(i, &us)| LatencySample::new(i, Duration::from_micros(us)))
            .collect()
    }

    fn ms(d: Duration) -> f64 {
        d.as_secs_f64() * 1_000.0
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn small_run_percentiles_bracket_mean(micros in prop::collection::vec(0u64..1_000_000, 2..=99)) {
            let s = samples(&micros);
            let p1 = ms(percentile(&s, 0.01));
            let p50 = ms(percentile(&s, 0.50));
            let p99 = ms(percentile(&s, 0.99));
            let mean = ms(mean_latency(&s));
            let eps = 1e-3;

            prop_assert!(p1 <= mean + eps, "p1 {} > mean {}", p1, mean);
            prop_assert!(mean <= p99 + eps, "mean {} > p99 {}", mean, p99);
            prop_assert!(p1 <= p50 + eps && p50 <= p99 + eps);

            let max = *micros.iter().max().unwrap() as f64 / 1_000.0;
            prop_assert!((p99 - max).abs() < eps, "p99 {} != max {}", p99, max);
        }

        #[test]
        fn percentile_monotonic_in_p(
            micros in prop::collection::vec(0u64..1_000_000, 1..300),
            a in 0.0f64..=1.0,
            b in 0.0f64..=1.0,
        ) {
            let s = samples(&micros);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(percentile(&s, lo) <= percentile(&s, hi) + Duration::from_nanos(1));
        }

        #[test]
        fn summarize_is_deterministic(
            micros in prop::collection::vec(1u64..100_000, 0..60),
            oracle_micros in 1u64..100_000,
        ) {
            let s = samples(&micros);
            let oracle = samples(&vec![oracle_micros; micros.len()]);
            let truth: Vec<u64> = (0..micros.len() as u64).collect();
            let outcomes: Vec<_> = truth
                .iter()
                .map(|&id| QueryOutcome::Completed(QueryResult {
                    matches: vec![Match { id, score: 1.0 }],
                }))
                .collect();

            let first = summarize(&outcomes, &truth, &s, Some(&oracle)).unwrap();
            let second = summarize(&outcomes, &truth, &s, Some(&oracle)).unwrap();
            prop_assert_eq!(first.n_queries, micros.len());
            if micros.is_empty() {
                prop_assert_eq!(first.recall_at_1, 0.0);
            } else {
                prop_assert_eq!(&first, &second);
                prop_assert_eq!(first.recall_at_1, 1.0);
            }
        }
    }
}
